//! Named response caches.
//!
//! One cache per generation, entries keyed by request identity (method +
//! URL). The trait seam lets the worker run against the persistent SQLite
//! backend in production and the in-memory backend in tests, and supports
//! the generation sweep (list + delete) performed at activation.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CacheStore, StoredResponse};
