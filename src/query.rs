//! Async query abstraction for data fetching through the query cache.
//!
//! Inspired by TanStack Query, a `Query<T>` observes one key of a shared
//! [`QueryCache`]. Fetches run on spawned tasks and write their result into
//! the cache; the query picks changes up when polled on each tick. Anyone
//! holding the cache (optimistic writes, deep-link invalidations) can change
//! what the query shows.
//!
//! # Example
//!
//! ```ignore
//! let client = client.clone();
//! let mut query = Query::new(cache, key, move |key| {
//!     let client = client.clone();
//!     let filter = InvoiceFilter::search(key.filter());
//!     async move { client.get_all(&filter).await.map_err(|e| e.to_string()) }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{QueryCache, QueryKey};

/// The state of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Last fetch succeeded
  Success,
  /// Last fetch failed with an error
  Error(String),
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching a key
type FetcherFn<T> = Arc<dyn Fn(&QueryKey) -> BoxFuture<T> + Send + Sync>;

/// Cache-backed query for one key at a time.
pub struct Query<T> {
  cache: QueryCache,
  key: QueryKey,
  fetcher: FetcherFn<T>,
  state: QueryState,
  data: Option<T>,
  /// Entry version last copied into `data`/`state`
  seen_version: Option<u64>,
  /// Set once fetched; an idle query ignores invalidations
  started: bool,
}

impl<T> Query<T>
where
  T: Serialize + DeserializeOwned + Send + 'static,
{
  /// Create a new query for `key`.
  ///
  /// The fetcher receives the key being fetched, so it keeps working after
  /// [`Query::set_key`].
  pub fn new<F, Fut>(cache: QueryCache, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn(&QueryKey) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      cache,
      key,
      fetcher: Arc::new(move |key| Box::pin(fetcher(key))),
      state: QueryState::Idle,
      data: None,
      seen_version: None,
      started: false,
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn state(&self) -> &QueryState {
    &self.state
  }

  /// Latest data for the current key, kept while a refetch runs
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  /// Loading with nothing to show yet
  pub fn is_loading(&self) -> bool {
    self.state == QueryState::Loading && self.data.is_none()
  }

  /// A fetch is running, whether or not there is data to show
  pub fn is_fetching(&self) -> bool {
    self.state == QueryState::Loading
  }

  pub fn is_error(&self) -> bool {
    matches!(self.state, QueryState::Error(_))
  }

  pub fn error(&self) -> Option<&str> {
    match &self.state {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Start fetching unless a fetch is running or the cached data is fresh.
  pub fn fetch(&mut self) {
    self.started = true;
    let entry = self.cache.state(&self.key);
    if entry.fetching {
      self.poll();
      return;
    }
    if !self.cache.is_stale(&self.key) {
      debug!(key = %self.key, "Serving fresh cached data");
      self.poll();
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, superseding any fetch in flight.
  pub fn refetch(&mut self) {
    self.started = true;
    self.start_fetch();
  }

  /// Switch to another key, showing whatever is cached for it and fetching
  /// if needed.
  pub fn set_key(&mut self, key: QueryKey) {
    if key == self.key {
      return;
    }
    debug!(from = %self.key, to = %key, "Query key changed");
    self.key = key;
    self.data = None;
    self.seen_version = None;
    self.state = QueryState::Idle;
    if self.started {
      self.fetch();
    }
  }

  /// Sync with the cache.
  ///
  /// Returns `true` if the state or data changed. Call this in your event
  /// loop tick handler. An invalidated key is refetched here.
  pub fn poll(&mut self) -> bool {
    let entry = self.cache.state(&self.key);

    if self.started && entry.invalidated && !entry.fetching {
      self.start_fetch();
      return true;
    }

    if self.seen_version == Some(entry.version) {
      return false;
    }
    self.seen_version = Some(entry.version);

    if entry.has_data {
      self.data = self.cache.get_query_data(&self.key);
    }
    self.state = if entry.fetching {
      QueryState::Loading
    } else if let Some(error) = entry.error {
      QueryState::Error(error)
    } else if entry.has_data {
      QueryState::Success
    } else {
      QueryState::Idle
    };
    true
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let ticket = self.cache.begin_fetch(&self.key);
    let future = (self.fetcher)(&self.key);
    let cache = self.cache.clone();

    tokio::spawn(async move {
      let result = future.await;
      cache.complete_fetch(ticket, result);
    });

    self.poll();
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("data", &self.data)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn key() -> QueryKey {
    QueryKey::new("numbers")
  }

  #[tokio::test]
  async fn test_query_success() {
    let cache = QueryCache::new();
    let mut query = Query::new(cache.clone(), key(), |_| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert_eq!(query.state(), &QueryState::Idle);

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert_eq!(query.state(), &QueryState::Success);
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
    assert_eq!(cache.get_query_data::<Vec<i32>>(&key()), Some(vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(QueryCache::new(), key(), |_| async {
      Err("Something went wrong".to_string())
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("Something went wrong"));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let mut query = Query::new(QueryCache::new(), key(), move |_| {
      let counter = counter_clone.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<_, String>(42)
      }
    });

    query.fetch();
    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refetch_supersedes_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(QueryCache::new(), key(), move |_| {
      let counter = counter_clone.clone();
      async move {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        // First call is slow so it resolves after the second
        let delay = if n == 0 { 80 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok::<_, String>(n)
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(5)).await;
    query.refetch();
    tokio::time::sleep(Duration::from_millis(150)).await;

    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_fresh_cache_is_not_refetched() {
    let cache = QueryCache::new().with_stale_time(Duration::from_secs(60));
    let ticket = cache.begin_fetch(&key());
    cache.complete_fetch(ticket, Ok(vec![7]));

    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let mut query = Query::new(cache, key(), move |_| {
      counter_clone.fetch_add(1, Ordering::SeqCst);
      async { Ok::<_, String>(vec![8]) }
    });

    query.fetch();
    assert_eq!(query.data(), Some(&vec![7]));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_invalidation_triggers_refetch() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let mut query = Query::new(cache.clone(), key(), move |_| {
      let n = counter_clone.fetch_add(1, Ordering::SeqCst);
      async move { Ok::<_, String>(n) }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));

    cache.invalidate(&key());
    assert!(query.poll());
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_sees_external_cache_writes() {
    let cache = QueryCache::new();
    let mut query = Query::new(cache.clone(), key(), |_| async { Ok::<_, String>(vec![1, 2]) });
    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    cache.update_query_data(&key(), |v: &mut Vec<i32>| v.push(3));

    assert!(query.poll());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_set_key_fetches_new_key() {
    let cache = QueryCache::new();
    let mut query = Query::new(cache.clone(), key(), |key: &QueryKey| {
      let filter = key.filter().to_string();
      async move { Ok::<_, String>(filter) }
    });
    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data().map(String::as_str), Some(""));

    query.set_key(key().with_filter("abc"));
    assert!(query.data().is_none());
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data().map(String::as_str), Some("abc"));
  }
}
