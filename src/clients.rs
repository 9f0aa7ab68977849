//! Client-control seam: the skip-waiting and claim lifecycle signals.

/// Host hooks for client control.
///
/// The worker raises these during install and activate; what they mean is
/// up to the embedding host (typically: let the new generation take effect
/// without waiting for old instances to close, and apply it to already-open
/// instances without a reload).
pub trait ClientControl: Send + Sync + 'static {
  /// Raised during install: do not wait for old instances to close before
  /// the new generation becomes eligible.
  fn skip_waiting(&self);

  /// Raised at the end of activation: take control of all currently open
  /// instances immediately.
  fn claim_clients(&self);
}

/// Host with no client tracking; both signals are ignored.
pub struct NoClients;

impl ClientControl for NoClients {
  fn skip_waiting(&self) {}

  fn claim_clients(&self) {}
}
