//! In-memory cache store.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::http::{Request, ResponseSnapshot};

use super::traits::{CacheStore, StoredResponse};

/// Store backed by process memory. Nothing survives a restart.
///
/// Clones share the same underlying caches, so a handle kept by the caller
/// observes writes made through the worker. Caches are kept in creation
/// order, matching the persistent backend's `list()`. Used by tests and for
/// embedders that do not want on-disk persistence.
#[derive(Clone, Default)]
pub struct MemoryStore {
  caches: Arc<Mutex<Vec<NamedCache>>>,
}

struct NamedCache {
  name: String,
  entries: HashMap<String, StoredResponse>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of entries in a cache, for assertions.
  pub fn entry_count(&self, cache: &str) -> usize {
    self
      .caches
      .lock()
      .map(|caches| {
        caches
          .iter()
          .find(|c| c.name == cache)
          .map(|c| c.entries.len())
          .unwrap_or(0)
      })
      .unwrap_or(0)
  }
}

impl CacheStore for MemoryStore {
  fn open(&self, cache: &str) -> Result<()> {
    let mut caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    if !caches.iter().any(|c| c.name == cache) {
      caches.push(NamedCache {
        name: cache.to_string(),
        entries: HashMap::new(),
      });
    }
    Ok(())
  }

  fn get(&self, cache: &str, request: &Request) -> Result<Option<StoredResponse>> {
    let caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      caches
        .iter()
        .find(|c| c.name == cache)
        .and_then(|c| c.entries.get(&request.cache_hash()))
        .cloned(),
    )
  }

  fn put(&self, cache: &str, request: &Request, response: &ResponseSnapshot) -> Result<()> {
    let mut caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let stored = StoredResponse {
      response: response.clone(),
      cached_at: Utc::now(),
    };
    match caches.iter_mut().find(|c| c.name == cache) {
      Some(c) => {
        c.entries.insert(request.cache_hash(), stored);
      }
      None => {
        // Writing into a cache implies it exists
        let mut entries = HashMap::new();
        entries.insert(request.cache_hash(), stored);
        caches.push(NamedCache {
          name: cache.to_string(),
          entries,
        });
      }
    }
    Ok(())
  }

  fn list(&self) -> Result<Vec<String>> {
    let caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(caches.iter().map(|c| c.name.clone()).collect())
  }

  fn delete(&self, cache: &str) -> Result<bool> {
    let mut caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    match caches.iter().position(|c| c.name == cache) {
      Some(index) => {
        caches.remove(index);
        Ok(true)
      }
      None => Ok(false),
    }
  }
}
