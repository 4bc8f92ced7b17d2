//! Optimistic write transaction over one cache key.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{debug, info};

use super::key::QueryKey;
use super::store::{QueryCache, Snapshot};

/// An optimistic write that has been applied to the cache but not yet
/// confirmed by the server.
///
/// Lifecycle:
/// 1. [`OptimisticUpdate::begin`] cancels in-flight reads of the key, takes a
///    snapshot, and applies the change, all before any network call
/// 2. The remote call runs
/// 3. [`OptimisticUpdate::commit`] keeps the change, or
///    [`OptimisticUpdate::rollback`] restores the snapshot verbatim
/// 4. Either way the key is invalidated so it is refetched from the server
///
/// Dropping an unsettled transaction rolls it back.
#[must_use = "an optimistic update must be committed or rolled back"]
pub struct OptimisticUpdate {
  cache: QueryCache,
  snapshot: Option<Snapshot>,
}

impl OptimisticUpdate {
  /// Apply `change` to the data under `key`, remembering what was there.
  pub fn begin<T, F>(cache: &QueryCache, key: &QueryKey, change: F) -> Self
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut T),
  {
    cache.cancel_queries(key);
    let snapshot = cache.snapshot_and_update(key, change);
    debug!(%key, "Applied optimistic update");

    Self {
      cache: cache.clone(),
      snapshot: Some(snapshot),
    }
  }

  pub fn key(&self) -> Option<&QueryKey> {
    self.snapshot.as_ref().map(Snapshot::key)
  }

  /// The server accepted the change
  pub fn commit(mut self) {
    if let Some(snapshot) = self.snapshot.take() {
      self.cache.invalidate(snapshot.key());
    }
  }

  /// The server rejected the change: put the snapshot back
  pub fn rollback(mut self) {
    self.revert();
  }

  /// Await the remote call, then commit or roll back depending on its
  /// outcome. The outcome is passed through.
  pub async fn settle<R, E, Fut>(self, remote: Fut) -> Result<R, E>
  where
    Fut: Future<Output = Result<R, E>>,
  {
    let result = remote.await;
    match &result {
      Ok(_) => self.commit(),
      Err(_) => self.rollback(),
    }
    result
  }

  fn revert(&mut self) {
    if let Some(snapshot) = self.snapshot.take() {
      let key = snapshot.key().clone();
      info!(%key, "Rolling back optimistic update");
      self.cache.restore(snapshot);
      self.cache.invalidate(&key);
    }
  }
}

impl Drop for OptimisticUpdate {
  fn drop(&mut self) {
    self.revert();
  }
}
