//! SQLite-backed cache store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::http::{Request, ResponseSnapshot};

use super::traits::{CacheStore, StoredResponse};

/// Persistent store: named caches and their entries survive process
/// restarts until a generation sweep deletes them.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the store at the default location for `app_name`.
  pub fn open_default(app_name: &str) -> Result<Self> {
    let path = Self::default_path(app_name)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open (or create) the store at an explicit path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// In-memory store, for tests and ephemeral runs.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory store: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Default database path for an application.
  fn default_path(app_name: &str) -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join(app_name).join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the named-cache tables.
const STORE_SCHEMA: &str = r#"
-- Named caches, one row per generation
CREATE TABLE IF NOT EXISTS caches (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Response entries keyed by request identity
CREATE TABLE IF NOT EXISTS entries (
    cache_name TEXT NOT NULL,
    request_key TEXT NOT NULL,
    url TEXT NOT NULL,
    response BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, request_key)
);

CREATE INDEX IF NOT EXISTS idx_entries_cache ON entries(cache_name);
"#;

impl CacheStore for SqliteStore {
  fn open(&self, cache: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO caches (name) VALUES (?)",
        params![cache],
      )
      .map_err(|e| eyre!("Failed to open cache {}: {}", cache, e))?;

    Ok(())
  }

  fn get(&self, cache: &str, request: &Request) -> Result<Option<StoredResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let result: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT response, cached_at FROM entries
         WHERE cache_name = ? AND request_key = ?",
        params![cache, request.cache_hash()],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query entry: {}", e))?;

    match result {
      Some((data, cached_at_str)) => {
        let response: ResponseSnapshot = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize entry for {}: {}", request.url, e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(StoredResponse {
          response,
          cached_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, cache: &str, request: &Request, response: &ResponseSnapshot) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let data =
      serde_json::to_vec(response).map_err(|e| eyre!("Failed to serialize response: {}", e))?;

    // Writing into a cache implies it exists
    conn
      .execute(
        "INSERT OR IGNORE INTO caches (name) VALUES (?)",
        params![cache],
      )
      .map_err(|e| eyre!("Failed to open cache {}: {}", cache, e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO entries (cache_name, request_key, url, response, cached_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
        params![cache, request.cache_hash(), request.url.as_str(), data],
      )
      .map_err(|e| eyre!("Failed to store entry for {}: {}", request.url, e))?;

    Ok(())
  }

  fn list(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM caches ORDER BY created_at, name")
      .map_err(|e| eyre!("Failed to prepare cache listing: {}", e))?;

    let names: Vec<String> = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list caches: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }

  fn delete(&self, cache: &str) -> Result<bool> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM entries WHERE cache_name = ?", params![cache])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", cache, e))?;

    let deleted = conn
      .execute("DELETE FROM caches WHERE name = ?", params![cache])
      .map_err(|e| eyre!("Failed to delete cache {}: {}", cache, e))?;

    Ok(deleted > 0)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::Request;
  use url::Url;

  fn request(url: &str) -> Request {
    Request::get(Url::parse(url).unwrap())
  }

  #[test]
  fn test_put_get_round_trip() {
    let store = SqliteStore::open_in_memory().unwrap();
    let req = request("https://app.example/index.html");
    let response = ResponseSnapshot::new(200, "<html></html>");

    store.put("app-cache-v1", &req, &response).unwrap();

    let stored = store.get("app-cache-v1", &req).unwrap().unwrap();
    assert_eq!(stored.response, response);
  }

  #[test]
  fn test_get_missing_cache_is_none() {
    let store = SqliteStore::open_in_memory().unwrap();
    let req = request("https://app.example/index.html");
    assert!(store.get("no-such-cache", &req).unwrap().is_none());
  }

  #[test]
  fn test_put_replaces_entry() {
    let store = SqliteStore::open_in_memory().unwrap();
    let req = request("https://app.example/app.js");

    store
      .put("app-cache-v1", &req, &ResponseSnapshot::new(200, "old"))
      .unwrap();
    store
      .put("app-cache-v1", &req, &ResponseSnapshot::new(200, "new"))
      .unwrap();

    let stored = store.get("app-cache-v1", &req).unwrap().unwrap();
    assert_eq!(stored.response.body, b"new");
  }

  #[test]
  fn test_open_is_idempotent_and_listed() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.open("app-cache-v1").unwrap();
    store.open("app-cache-v1").unwrap();
    store.open("app-cache-v2").unwrap();

    let names = store.list().unwrap();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"app-cache-v1".to_string()));
    assert!(names.contains(&"app-cache-v2".to_string()));
  }

  #[test]
  fn test_delete_removes_cache_and_entries() {
    let store = SqliteStore::open_in_memory().unwrap();
    let req = request("https://app.example/index.html");
    store
      .put("app-cache-v1", &req, &ResponseSnapshot::new(200, "x"))
      .unwrap();

    assert!(store.delete("app-cache-v1").unwrap());
    assert!(store.list().unwrap().is_empty());
    assert!(store.get("app-cache-v1", &req).unwrap().is_none());

    // Second delete reports the cache as already gone
    assert!(!store.delete("app-cache-v1").unwrap());
  }

  #[test]
  fn test_entries_are_scoped_by_cache() {
    let store = SqliteStore::open_in_memory().unwrap();
    let req = request("https://app.example/index.html");
    store
      .put("app-cache-v1", &req, &ResponseSnapshot::new(200, "v1"))
      .unwrap();
    store
      .put("app-cache-v2", &req, &ResponseSnapshot::new(200, "v2"))
      .unwrap();

    assert_eq!(
      store.get("app-cache-v1", &req).unwrap().unwrap().response.body,
      b"v1"
    );
    assert_eq!(
      store.get("app-cache-v2", &req).unwrap().unwrap().response.body,
      b"v2"
    );
  }
}
