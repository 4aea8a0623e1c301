//! Timeout and bounded retry around any completion checker.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{CheckError, CompletionChecker};

/// How long a single check may take and how often it is retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
  /// Budget of a single attempt.
  pub attempt_timeout_ms: u64,
  /// Total attempts, including the first one. Zero behaves like one.
  pub max_attempts: u32,
  /// Delay before the first retry; doubled for every further retry.
  pub base_delay_ms: u64,
  /// Upper bound of the delay between two attempts.
  pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempt_timeout_ms: 10_000,
      max_attempts: 3,
      base_delay_ms: 250,
      max_delay_ms: 5_000,
    }
  }
}

impl RetryPolicy {
  /// A policy that never retries.
  pub fn once(attempt_timeout: Duration) -> Self {
    Self {
      attempt_timeout_ms: attempt_timeout.as_millis() as u64,
      max_attempts: 1,
      ..Self::default()
    }
  }

  pub fn attempt_timeout(&self) -> Duration {
    Duration::from_millis(self.attempt_timeout_ms)
  }

  /// Delay to wait after the given failed attempt (1-based).
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 1u64
      .checked_shl(attempt.saturating_sub(1))
      .unwrap_or(u64::MAX);
    let delay = self.base_delay_ms.saturating_mul(factor);
    Duration::from_millis(delay.min(self.max_delay_ms))
  }
}

/// Wraps a checker so every attempt is time-bounded and transient failures
/// are retried with exponential backoff.
///
/// Non-transient failures (see [`CheckError::is_transient`]) are returned
/// immediately. When attempts run out, the last error is returned.
#[derive(Debug, Clone)]
pub struct RetryingChecker<C> {
  inner: C,
  policy: RetryPolicy,
}

impl<C: CompletionChecker> RetryingChecker<C> {
  pub fn new(inner: C, policy: RetryPolicy) -> Self {
    Self { inner, policy }
  }

  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }

  pub fn inner(&self) -> &C {
    &self.inner
  }

  async fn attempt(&self, contract_name: &str, execution_key: &str) -> Result<bool, CheckError> {
    let timeout = self.policy.attempt_timeout();
    match tokio::time::timeout(
      timeout,
      self.inner.check_completed(contract_name, execution_key),
    )
    .await
    {
      Ok(result) => result,
      Err(_) => Err(CheckError::Timeout {
        timeout_ms: timeout.as_millis() as u64,
      }),
    }
  }
}

#[async_trait]
impl<C: CompletionChecker> CompletionChecker for RetryingChecker<C> {
  async fn check_completed(
    &self,
    contract_name: &str,
    execution_key: &str,
  ) -> Result<bool, CheckError> {
    let max_attempts = self.policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
      match self.attempt(contract_name, execution_key).await {
        Ok(completed) => return Ok(completed),
        Err(e) if e.is_transient() && attempt < max_attempts => {
          let delay = self.policy.backoff(attempt);
          warn!(
            contract_name,
            execution_key,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "completion check failed, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => {
          debug!(contract_name, execution_key, attempt, error = %e, "completion check gave up");
          return Err(e);
        }
      }
    }
  }
}
