//! Completion checks for deployed automata.
//!
//! The status propagator only needs one question answered: "has this automaton
//! of this deployed contract completed?". [`CompletionChecker`] is that
//! capability. A failed check is an `Err`, never `Ok(false)`, so callers can
//! choose how to treat an unreachable backend.
//!
//! Implementations:
//! - [`HttpCompletionChecker`] calls the execution backend's REST API
//! - [`RetryingChecker`] bounds any checker with a per-attempt timeout and
//!   retries transient failures with exponential backoff

mod error;
mod http;
mod retry;

pub use error::CheckError;
pub use http::{DEFAULT_TIMEOUT_SECS, HttpCheckerConfig, HttpCompletionChecker};
pub use retry::{RetryPolicy, RetryingChecker};

use std::sync::Arc;

use async_trait::async_trait;

/// Asks the execution backend whether an automaton has completed.
#[async_trait]
pub trait CompletionChecker: Send + Sync {
  /// Check the automaton addressed by `execution_key` (e.g. `Automata2`)
  /// within the deployed contract `contract_name`.
  async fn check_completed(
    &self,
    contract_name: &str,
    execution_key: &str,
  ) -> Result<bool, CheckError>;
}

#[async_trait]
impl<T: CompletionChecker + ?Sized> CompletionChecker for Arc<T> {
  async fn check_completed(
    &self,
    contract_name: &str,
    execution_key: &str,
  ) -> Result<bool, CheckError> {
    (**self).check_completed(contract_name, execution_key).await
  }
}
