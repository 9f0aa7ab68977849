//! Offline application-shell caching.
//!
//! A single versioned cache of HTTP responses, kept aligned with one
//! declared generation identifier, populated from a pre-cache manifest at
//! install time and answering fetch events by stale-while-revalidate (or
//! the legacy cache-first mode). The store, network, client control and
//! observability are all trait seams so the worker runs against a real
//! network and SQLite in production and against mocks in tests.

pub mod clients;
pub mod config;
pub mod events;
pub mod http;
pub mod net;
pub mod store;
pub mod worker;

pub use clients::{ClientControl, NoClients};
pub use config::{InstallPolicy, Strategy, WorkerConfig};
pub use events::{EventSink, TracingSink, WorkerEvent};
pub use http::{Method, Request, ResponseSnapshot};
pub use net::{HttpNetwork, Network};
pub use store::{CacheStore, MemoryStore, SqliteStore, StoredResponse};
pub use worker::{ActivateReport, CacheWorker, FetchOutcome, InstallReport, Served};
