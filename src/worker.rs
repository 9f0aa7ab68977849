//! The offline cache manager: install, activate and fetch handling.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clients::{ClientControl, NoClients};
use crate::config::{InstallPolicy, Strategy, WorkerConfig};
use crate::events::{EventSink, TracingSink, WorkerEvent};
use crate::http::{Request, ResponseSnapshot};
use crate::net::Network;
use crate::store::CacheStore;

/// How a fetch event was answered.
#[derive(Debug)]
pub enum Served {
  /// A stored response, returned without waiting for the network.
  Cached(ResponseSnapshot),
  /// A live network response.
  Network(ResponseSnapshot),
  /// The worker declined to intercept (non-GET, or matched the exclusion
  /// rules); the host handles the request natively.
  Passthrough,
}

/// Outcome of a fetch event.
#[derive(Debug)]
pub struct FetchOutcome {
  pub served: Served,
  /// Background revalidation task, when one was spawned. Callers that
  /// want the refreshed entry can await it; dropping the handle is fine,
  /// the task runs to completion either way.
  pub revalidation: Option<JoinHandle<()>>,
}

impl FetchOutcome {
  fn passthrough() -> Self {
    Self {
      served: Served::Passthrough,
      revalidation: None,
    }
  }
}

/// Result of an install pass over the pre-cache manifest.
#[derive(Debug, Default)]
pub struct InstallReport {
  /// Manifest entries fetched and stored
  pub cached: Vec<String>,
  /// Manifest entries that failed, with the error text
  pub failed: Vec<(String, String)>,
}

/// Result of an activation sweep.
#[derive(Debug, Default)]
pub struct ActivateReport {
  /// Stale caches deleted
  pub deleted: Vec<String>,
  /// Stale caches that could not be deleted, with the error text
  pub failed: Vec<(String, String)>,
}

/// Offline cache manager for one application generation.
///
/// Keeps a single named cache aligned with the configured generation
/// identifier and answers fetch events from it according to the configured
/// strategy. Cheap to clone; clones share the store, network and
/// collaborators, so many fetch events can be handled concurrently.
pub struct CacheWorker<S: CacheStore, N: Network> {
  config: Arc<WorkerConfig>,
  store: Arc<S>,
  network: Arc<N>,
  clients: Arc<dyn ClientControl>,
  events: Arc<dyn EventSink>,
}

impl<S: CacheStore, N: Network> CacheWorker<S, N> {
  pub fn new(config: WorkerConfig, store: S, network: N) -> Self {
    Self {
      config: Arc::new(config),
      store: Arc::new(store),
      network: Arc::new(network),
      clients: Arc::new(NoClients),
      events: Arc::new(TracingSink),
    }
  }

  /// Replace the client-control host.
  pub fn with_clients(mut self, clients: impl ClientControl) -> Self {
    self.clients = Arc::new(clients);
    self
  }

  /// Replace the event sink.
  pub fn with_events(mut self, events: impl EventSink) -> Self {
    self.events = Arc::new(events);
    self
  }

  pub fn config(&self) -> &WorkerConfig {
    &self.config
  }

  /// Install this generation: open its cache, signal skip-waiting, and
  /// populate the cache from the pre-cache manifest.
  ///
  /// Under `InstallPolicy::BestEffort` every manifest entry is attempted
  /// and failures end up in the report; under `InstallPolicy::Strict` the
  /// first failure aborts the install.
  pub async fn install(&self) -> Result<InstallReport> {
    let cache = self.config.cache_name();
    self.store.open(&cache)?;

    info!(
      cache = %cache,
      urls = self.config.precache.len(),
      "installing generation"
    );

    // Take effect on next reload rather than waiting for old instances
    // to close.
    self.clients.skip_waiting();

    let mut report = InstallReport::default();
    match self.config.install_policy {
      // All-or-nothing: entries are attempted in manifest order and the
      // first failure aborts before anything further is tried.
      InstallPolicy::Strict => {
        for raw in &self.config.precache {
          match self.precache_one(&cache, raw).await {
            Ok(()) => report.cached.push(raw.clone()),
            Err(e) => {
              let error = e.to_string();
              self.events.record(WorkerEvent::PrecacheFailed {
                url: raw.clone(),
                error: error.clone(),
              });
              return Err(eyre!("Install aborted: failed to precache {}: {}", raw, error));
            }
          }
        }
      }
      // Concurrent batch: every entry gets its attempt regardless of the
      // others, like the browser's batch add.
      InstallPolicy::BestEffort => {
        let attempts = self.config.precache.iter().map(|raw| {
          let cache = cache.as_str();
          async move { (raw, self.precache_one(cache, raw).await) }
        });
        for (raw, result) in futures::future::join_all(attempts).await {
          match result {
            Ok(()) => report.cached.push(raw.clone()),
            Err(e) => {
              let error = e.to_string();
              self.events.record(WorkerEvent::PrecacheFailed {
                url: raw.clone(),
                error: error.clone(),
              });
              report.failed.push((raw.clone(), error));
            }
          }
        }
      }
    }

    Ok(report)
  }

  async fn precache_one(&self, cache: &str, raw: &str) -> Result<()> {
    let url = self.config.manifest_url(raw)?;
    let request = Request::get(url);
    let response = self.network.fetch(request.clone()).await?;
    if !response.is_success() {
      return Err(eyre!("Unexpected status {} for {}", response.status, request.url));
    }
    self.store.put(cache, &request, &response)
  }

  /// Activate this generation: delete every cache that does not belong to
  /// it, then claim all open clients.
  ///
  /// Deletion failures are recorded and do not block activation.
  /// Idempotent: a second call with no intervening install finds nothing
  /// to delete.
  pub fn activate(&self) -> Result<ActivateReport> {
    let current = self.config.cache_name();
    let mut report = ActivateReport::default();

    for name in self.store.list()? {
      if name == current {
        continue;
      }
      match self.store.delete(&name) {
        Ok(_) => {
          self
            .events
            .record(WorkerEvent::StaleCacheDeleted { cache: name.clone() });
          report.deleted.push(name);
        }
        Err(e) => {
          let error = e.to_string();
          self.events.record(WorkerEvent::CleanupFailed {
            cache: name.clone(),
            error: error.clone(),
          });
          report.failed.push((name, error));
        }
      }
    }

    // Activation may run without a prior install (e.g. after a crash);
    // the current cache must exist either way.
    self.store.open(&current)?;

    info!(cache = %current, deleted = report.deleted.len(), "activated generation");
    self.clients.claim_clients();

    Ok(report)
  }

  /// Handle one fetch event.
  ///
  /// Non-GET requests and requests matching the exclusion rules pass
  /// through untouched. Everything else is answered from the cache and/or
  /// the network according to the configured strategy.
  pub async fn handle_fetch(&self, request: Request) -> Result<FetchOutcome> {
    if !request.method.is_get() {
      debug!(url = %request.url, method = request.method.as_str(), "passthrough: non-GET");
      return Ok(FetchOutcome::passthrough());
    }

    if self.config.is_excluded(&request.url) {
      debug!(url = %request.url, "passthrough: excluded");
      return Ok(FetchOutcome::passthrough());
    }

    match self.config.strategy {
      Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
      Strategy::CacheFirst => self.cache_first(request).await,
    }
  }

  async fn stale_while_revalidate(&self, request: Request) -> Result<FetchOutcome> {
    let cache = self.config.cache_name();

    if let Some(stored) = self.lookup(&cache, &request) {
      // Serve the stored response now; refresh it in the background. The
      // caller never sees a revalidation failure once a cached response
      // exists.
      let handle = self.spawn_revalidation(cache, request);
      return Ok(FetchOutcome {
        served: Served::Cached(stored.response),
        revalidation: Some(handle),
      });
    }

    // Nothing stored: the caller waits on the network, and a failure
    // propagates to it.
    let response = self.network.fetch(request.clone()).await?;
    if response.status == 200 {
      self.write_back(&cache, &request, &response);
    }
    Ok(FetchOutcome {
      served: Served::Network(response),
      revalidation: None,
    })
  }

  async fn cache_first(&self, request: Request) -> Result<FetchOutcome> {
    let cache = self.config.cache_name();

    if let Some(stored) = self.lookup(&cache, &request) {
      return Ok(FetchOutcome {
        served: Served::Cached(stored.response),
        revalidation: None,
      });
    }

    // Legacy mode: misses go to the network and are not written back;
    // the cache only fills at install time.
    let response = self.network.fetch(request).await?;
    Ok(FetchOutcome {
      served: Served::Network(response),
      revalidation: None,
    })
  }

  /// Cache lookup; a read failure is recorded and treated as a miss.
  fn lookup(&self, cache: &str, request: &Request) -> Option<crate::store::StoredResponse> {
    match self.store.get(cache, request) {
      Ok(stored) => stored,
      Err(e) => {
        self.events.record(WorkerEvent::StoreReadFailed {
          url: request.url.to_string(),
          error: e.to_string(),
        });
        None
      }
    }
  }

  /// Cache write; a failure is recorded, never surfaced.
  fn write_back(&self, cache: &str, request: &Request, response: &ResponseSnapshot) {
    if let Err(e) = self.store.put(cache, request, response) {
      self.events.record(WorkerEvent::StoreWriteFailed {
        url: request.url.to_string(),
        error: e.to_string(),
      });
    }
  }

  fn spawn_revalidation(&self, cache: String, request: Request) -> JoinHandle<()> {
    let store = Arc::clone(&self.store);
    let network = Arc::clone(&self.network);
    let events = Arc::clone(&self.events);

    tokio::spawn(async move {
      match network.fetch(request.clone()).await {
        // Exactly 200: redirects and partial-content responses never
        // overwrite the stored entry.
        Ok(response) if response.status == 200 => {
          if let Err(e) = store.put(&cache, &request, &response) {
            events.record(WorkerEvent::StoreWriteFailed {
              url: request.url.to_string(),
              error: e.to_string(),
            });
          }
        }
        Ok(response) => {
          debug!(url = %request.url, status = response.status, "revalidation skipped: non-200");
        }
        Err(e) => {
          events.record(WorkerEvent::RevalidationFailed {
            url: request.url.to_string(),
            error: e.to_string(),
          });
        }
      }
    })
  }
}

impl<S: CacheStore, N: Network> Clone for CacheWorker<S, N> {
  fn clone(&self) -> Self {
    Self {
      config: Arc::clone(&self.config),
      store: Arc::clone(&self.store),
      network: Arc::clone(&self.network),
      clients: Arc::clone(&self.clients),
      events: Arc::clone(&self.events),
    }
  }
}
