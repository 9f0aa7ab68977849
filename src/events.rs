//! Typed events for failures the worker absorbs instead of surfacing.
//!
//! The original script silenced these in catch blocks. Routing them through
//! an injected sink keeps "what the caller got" and "what went wrong in the
//! background" separately observable.

use tracing::{info, warn};

/// A failure or notable action handled without surfacing it to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
  /// A manifest URL could not be fetched or stored at install time.
  PrecacheFailed { url: String, error: String },
  /// A background revalidation fetch failed after the cached response was
  /// already served.
  RevalidationFailed { url: String, error: String },
  /// A cache lookup failed; the request was treated as a miss.
  StoreReadFailed { url: String, error: String },
  /// A cache write failed; the stored entry simply does not update.
  StoreWriteFailed { url: String, error: String },
  /// A stale-generation cache was deleted during activation.
  StaleCacheDeleted { cache: String },
  /// A stale-generation cache could not be deleted; activation continues.
  CleanupFailed { cache: String, error: String },
}

/// Collaborator that receives absorbed events.
pub trait EventSink: Send + Sync + 'static {
  fn record(&self, event: WorkerEvent);
}

/// Default sink: forwards events to `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
  fn record(&self, event: WorkerEvent) {
    match event {
      WorkerEvent::PrecacheFailed { url, error } => {
        warn!(url = %url, error = %error, "failed to precache resource");
      }
      WorkerEvent::RevalidationFailed { url, error } => {
        warn!(url = %url, error = %error, "background revalidation failed");
      }
      WorkerEvent::StoreReadFailed { url, error } => {
        warn!(url = %url, error = %error, "cache lookup failed, treating as miss");
      }
      WorkerEvent::StoreWriteFailed { url, error } => {
        warn!(url = %url, error = %error, "cache write failed");
      }
      WorkerEvent::StaleCacheDeleted { cache } => {
        info!(cache = %cache, "deleted stale cache");
      }
      WorkerEvent::CleanupFailed { cache, error } => {
        warn!(cache = %cache, error = %error, "failed to delete stale cache");
      }
    }
  }
}
