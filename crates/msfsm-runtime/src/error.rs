//! Runtime errors.

use msfsm_flow::FlowError;
use msfsm_store::StoreError;

/// Errors that can occur during runtime operations.
///
/// Failed completion checks are not errors: they are folded into node
/// statuses according to the configured [`FailurePolicy`](crate::FailurePolicy).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Persisting or loading the execution snapshot failed.
  #[error("snapshot storage failed")]
  Store(#[from] StoreError),

  /// Flow lookup failed.
  #[error(transparent)]
  Flow(#[from] FlowError),

  /// A refresh cycle is already running for this flow.
  #[error("a refresh is already in progress")]
  RefreshInProgress,
}
