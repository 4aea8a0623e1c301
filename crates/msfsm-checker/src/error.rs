use thiserror::Error;

/// Errors that can occur while checking an automaton's completion.
#[derive(Debug, Error)]
pub enum CheckError {
  /// The request could not be sent or its body not read.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The backend answered with a non-success status.
  #[error("backend returned {status}: {body}")]
  Status { status: u16, body: String },

  /// The backend answered with an explicit error message.
  #[error("backend error: {0}")]
  Backend(String),

  /// The backend answered with something other than a result or an error.
  #[error("unexpected response: {0}")]
  UnexpectedResponse(String),

  /// A single attempt exceeded its time budget.
  #[error("completion check timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// The endpoint URL could not be built.
  #[error("invalid url: {0}")]
  Url(#[from] url::ParseError),
}

impl CheckError {
  /// Whether retrying the same check may succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      CheckError::Http(_) | CheckError::Timeout { .. } => true,
      CheckError::Status { status, .. } => *status == 429 || *status >= 500,
      CheckError::Backend(_) | CheckError::UnexpectedResponse(_) | CheckError::Url(_) => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_transient_classification() {
    assert!(CheckError::Timeout { timeout_ms: 10 }.is_transient());
    assert!(
      CheckError::Status {
        status: 503,
        body: String::new()
      }
      .is_transient()
    );
    assert!(
      CheckError::Status {
        status: 429,
        body: String::new()
      }
      .is_transient()
    );
    assert!(
      !CheckError::Status {
        status: 404,
        body: String::new()
      }
      .is_transient()
    );
    assert!(!CheckError::Backend("clause not deployed".to_string()).is_transient());
  }
}
