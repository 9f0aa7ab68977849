//! Storage trait for named response caches.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::http::{Request, ResponseSnapshot};

/// A response as it sits in a named cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
  /// The stored snapshot
  pub response: ResponseSnapshot,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
}

/// Backend for named response caches.
///
/// Mirrors the browser cache surface: caches are created by name, entries
/// are keyed by request identity, and whole caches can be enumerated and
/// deleted during generation sweeps. A `put` for a given request replaces
/// any previous entry atomically; no locking beyond that is provided or
/// assumed.
pub trait CacheStore: Send + Sync + 'static {
  /// Create the named cache if absent. Opening an existing cache is a
  /// no-op.
  fn open(&self, cache: &str) -> Result<()>;

  /// Look up the stored response for a request. A missing cache behaves
  /// like an empty one.
  fn get(&self, cache: &str, request: &Request) -> Result<Option<StoredResponse>>;

  /// Insert or replace the entry for a request.
  fn put(&self, cache: &str, request: &Request, response: &ResponseSnapshot) -> Result<()>;

  /// Names of all caches, oldest first.
  fn list(&self) -> Result<Vec<String>>;

  /// Delete a whole cache and its entries. Returns whether it existed.
  fn delete(&self, cache: &str) -> Result<bool>;
}
