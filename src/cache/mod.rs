//! In-memory query cache with optimistic updates.
//!
//! This module provides an entity-agnostic store that:
//! - Keeps query results under a key of entity type + filter
//! - Versions every entry so observers can tell when data changed
//! - Supports snapshot, optimistic write, and verbatim rollback
//! - Suppresses results of fetches cancelled by a newer optimistic write
//! - Marks entries invalidated so active queries refetch them

mod key;
mod optimistic;
mod store;
mod traits;

pub use key::QueryKey;
pub use optimistic::OptimisticUpdate;
pub use store::QueryCache;
pub use traits::{modify_by_key, remove_by_key, Cacheable};
