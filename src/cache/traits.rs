//! Core traits for cached entities.

use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be cached.
///
/// Implementors must provide a unique cache key, which is how optimistic
/// writes find the record to replace or remove inside a cached list.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity (e.g. invoice id)
  fn cache_key(&self) -> &str;

  /// Entity type name, also the first component of list query keys
  fn entity_type() -> &'static str;
}

/// Replace the entity with the same key in a cached list.
/// Returns true if an entity was modified.
pub fn modify_by_key<T, F>(list: &mut [T], key: &str, f: F) -> bool
where
  T: Cacheable,
  F: FnOnce(&mut T),
{
  match list.iter_mut().find(|e| e.cache_key() == key) {
    Some(entity) => {
      f(entity);
      true
    }
    None => false,
  }
}

/// Drop the entity with the given key from a cached list, keeping order.
/// Returns true if an entity was removed.
pub fn remove_by_key<T: Cacheable>(list: &mut Vec<T>, key: &str) -> bool {
  let before = list.len();
  list.retain(|e| e.cache_key() != key);
  list.len() != before
}
