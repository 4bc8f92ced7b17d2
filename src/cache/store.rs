//! Keyed, versioned query store.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::key::QueryKey;

#[derive(Debug, Default)]
struct Entry {
  /// Serialized query result, None until the first successful fetch
  data: Option<Value>,
  /// Bumped on every change observers should re-read
  version: u64,
  /// When the data last came from the server
  updated_at: Option<Instant>,
  /// Error of the last fetch, cleared by the next successful one
  error: Option<String>,
  /// Generation of the fetch whose result will be accepted
  generation: u64,
  fetching: bool,
  invalidated: bool,
}

/// Observable state of one cache entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryState {
  pub version: u64,
  pub has_data: bool,
  pub fetching: bool,
  pub invalidated: bool,
  pub error: Option<String>,
}

/// Handed out by [`QueryCache::begin_fetch`]; only the ticket of the latest
/// uncancelled fetch may write its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
  key: QueryKey,
  generation: u64,
}

/// Verbatim copy of one entry's data, used to roll back optimistic writes
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
  key: QueryKey,
  data: Option<Value>,
}

impl Snapshot {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

/// Shared query cache.
///
/// Cloning is cheap and every clone sees the same entries. Each public method
/// takes the lock exactly once, so a read-modify-write through
/// [`QueryCache::update_query_data`] is atomic with respect to other callers.
#[derive(Clone)]
pub struct QueryCache {
  entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
  /// How long fetched data counts as fresh
  stale_time: Duration,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryCache {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      stale_time: Duration::ZERO,
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
    // Entries are plain data; a panic elsewhere cannot leave them half-written
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Read and decode the data stored under `key`
  pub fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
    let entries = self.entries();
    let value = entries.get(key)?.data.as_ref()?;
    match T::deserialize(value) {
      Ok(data) => Some(data),
      Err(e) => {
        warn!(%key, error = %e, "Cached data has unexpected shape");
        None
      }
    }
  }

  /// Replace the data stored under `key`
  pub fn set_query_data<T: Serialize>(&self, key: &QueryKey, data: &T) {
    let Some(value) = encode(key, data) else {
      return;
    };
    let mut entries = self.entries();
    let entry = entries.entry(key.clone()).or_default();
    entry.data = Some(value);
    entry.version += 1;
  }

  /// Read-modify-write of the data under `key`.
  ///
  /// Does nothing and returns false if there is no data to modify.
  pub fn update_query_data<T, F>(&self, key: &QueryKey, f: F) -> bool
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut T),
  {
    let mut entries = self.entries();
    match entries.get_mut(key) {
      Some(entry) => modify_entry(key, entry, f),
      None => false,
    }
  }

  /// Snapshot the data under `key`, then modify it, under one lock
  pub fn snapshot_and_update<T, F>(&self, key: &QueryKey, f: F) -> Snapshot
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut T),
  {
    let mut entries = self.entries();
    let Some(entry) = entries.get_mut(key) else {
      return Snapshot {
        key: key.clone(),
        data: None,
      };
    };
    let snapshot = Snapshot {
      key: key.clone(),
      data: entry.data.clone(),
    };
    modify_entry(key, entry, f);
    snapshot
  }

  /// Copy the data under `key` as it is right now
  pub fn snapshot(&self, key: &QueryKey) -> Snapshot {
    let entries = self.entries();
    Snapshot {
      key: key.clone(),
      data: entries.get(key).and_then(|e| e.data.clone()),
    }
  }

  /// Put a snapshot back verbatim
  pub fn restore(&self, snapshot: Snapshot) {
    let mut entries = self.entries();
    let entry = entries.entry(snapshot.key).or_default();
    entry.data = snapshot.data;
    entry.version += 1;
  }

  /// Current state of the entry under `key`
  pub fn state(&self, key: &QueryKey) -> EntryState {
    let entries = self.entries();
    entries
      .get(key)
      .map(|e| EntryState {
        version: e.version,
        has_data: e.data.is_some(),
        fetching: e.fetching,
        invalidated: e.invalidated,
        error: e.error.clone(),
      })
      .unwrap_or_default()
  }

  /// Whether `key` should be fetched again before it is trusted
  pub fn is_stale(&self, key: &QueryKey) -> bool {
    let entries = self.entries();
    match entries.get(key) {
      Some(e) if e.data.is_some() && !e.invalidated => e
        .updated_at
        .map(|t| t.elapsed() >= self.stale_time)
        .unwrap_or(true),
      _ => true,
    }
  }

  /// Register a fetch for `key`. Any earlier fetch still in flight loses
  /// the right to write its result.
  pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
    let mut entries = self.entries();
    let entry = entries.entry(key.clone()).or_default();
    entry.generation += 1;
    entry.fetching = true;
    entry.invalidated = false;
    entry.version += 1;
    FetchTicket {
      key: key.clone(),
      generation: entry.generation,
    }
  }

  /// Store the outcome of a fetch.
  ///
  /// Returns false if the fetch was cancelled or superseded, in which case
  /// the result is dropped.
  pub fn complete_fetch<T: Serialize>(&self, ticket: FetchTicket, result: Result<T, String>) -> bool {
    let value = match result {
      Ok(data) => match encode(&ticket.key, &data) {
        Some(v) => Ok(v),
        None => Err("Could not store fetched data".to_string()),
      },
      Err(e) => Err(e),
    };

    let mut entries = self.entries();
    let Some(entry) = entries.get_mut(&ticket.key) else {
      return false;
    };
    if entry.generation != ticket.generation {
      debug!(key = %ticket.key, "Dropping result of cancelled fetch");
      return false;
    }

    entry.fetching = false;
    entry.version += 1;
    match value {
      Ok(v) => {
        entry.data = Some(v);
        entry.error = None;
        entry.updated_at = Some(Instant::now());
      }
      Err(e) => entry.error = Some(e),
    }
    true
  }

  /// Cancel any fetch in flight for `key`.
  ///
  /// Cancellation is advisory: the request keeps running, but its result
  /// will not be written.
  pub fn cancel_queries(&self, key: &QueryKey) {
    let mut entries = self.entries();
    if let Some(entry) = entries.get_mut(key) {
      if entry.fetching {
        debug!(%key, "Cancelling in-flight fetch");
        entry.generation += 1;
        entry.fetching = false;
        entry.version += 1;
      }
    }
  }

  /// Mark `key` as needing a refetch. Returns false if nothing is cached
  /// under it.
  pub fn invalidate(&self, key: &QueryKey) -> bool {
    let mut entries = self.entries();
    match entries.get_mut(key) {
      Some(entry) => {
        entry.invalidated = true;
        entry.version += 1;
        true
      }
      None => false,
    }
  }

  /// Invalidate every key of an entity type, whatever its filter.
  /// Returns the number of keys invalidated.
  pub fn invalidate_entity(&self, entity: &str) -> usize {
    let mut entries = self.entries();
    let mut count = 0;
    for (key, entry) in entries.iter_mut() {
      if key.entity() == entity {
        entry.invalidated = true;
        entry.version += 1;
        count += 1;
      }
    }
    count
  }
}

fn encode<T: Serialize>(key: &QueryKey, data: &T) -> Option<Value> {
  match serde_json::to_value(data) {
    Ok(v) => Some(v),
    Err(e) => {
      warn!(%key, error = %e, "Failed to serialize data for cache");
      None
    }
  }
}

fn modify_entry<T, F>(key: &QueryKey, entry: &mut Entry, f: F) -> bool
where
  T: Serialize + DeserializeOwned,
  F: FnOnce(&mut T),
{
  let Some(value) = entry.data.as_ref() else {
    return false;
  };
  let mut data = match T::deserialize(value) {
    Ok(d) => d,
    Err(e) => {
      warn!(%key, error = %e, "Cached data has unexpected shape");
      return false;
    }
  };
  f(&mut data);
  let Some(value) = encode(key, &data) else {
    return false;
  };
  entry.data = Some(value);
  entry.version += 1;
  true
}
