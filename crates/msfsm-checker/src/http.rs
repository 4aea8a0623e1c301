//! HTTP completion checker for the execution backend's REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{CheckError, CompletionChecker};

/// Default timeout for a single HTTP request: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Clause function every deployed automaton exposes.
const IS_COMPLETED_FUNCTION: &str = "is_completed";

/// Configuration for [`HttpCompletionChecker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpCheckerConfig {
  /// Base URL of the execution backend, e.g. `http://localhost:8000`.
  pub base_url: Url,

  /// HTTP request timeout in seconds. Zero falls back to the default.
  #[serde(default = "default_timeout_secs")]
  pub request_timeout_secs: u64,

  /// User-Agent header to send with requests.
  #[serde(default)]
  pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
  DEFAULT_TIMEOUT_SECS
}

impl HttpCheckerConfig {
  pub fn new(base_url: Url) -> Self {
    Self {
      base_url,
      request_timeout_secs: DEFAULT_TIMEOUT_SECS,
      user_agent: None,
    }
  }

  /// Returns the effective timeout, using the default if zero.
  pub fn effective_timeout(&self) -> Duration {
    if self.request_timeout_secs == 0 {
      Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    } else {
      Duration::from_secs(self.request_timeout_secs)
    }
  }

  /// Returns the effective user agent, using the crate name if not set.
  pub fn effective_user_agent(&self) -> String {
    self
      .user_agent
      .clone()
      .unwrap_or_else(|| format!("msfsm/{}", env!("CARGO_PKG_VERSION")))
  }
}

#[derive(Debug, Serialize)]
struct ExecutionRequest<'a> {
  args: &'a [serde_json::Value],
}

#[derive(Debug, Deserialize)]
struct ExecutionResponse {
  #[serde(default)]
  result: Option<serde_json::Value>,
  #[serde(default)]
  error: Option<String>,
}

/// Checks completion by executing the automaton's `is_completed` clause
/// function on the backend.
///
/// `POST {base}/smart-contracts/{contract}/clause/{key}/function/is_completed/execute`
/// with `{"args": []}`. The backend answers `{"result": <value>}`; only a
/// literal `true` counts as completed.
#[derive(Debug, Clone)]
pub struct HttpCompletionChecker {
  http: Client,
  config: HttpCheckerConfig,
}

impl HttpCompletionChecker {
  pub fn new(config: HttpCheckerConfig) -> Result<Self, CheckError> {
    let http = Client::builder()
      .timeout(config.effective_timeout())
      .user_agent(config.effective_user_agent())
      .build()?;

    Ok(Self { http, config })
  }

  pub fn config(&self) -> &HttpCheckerConfig {
    &self.config
  }

  /// Endpoint executing `function` on one automaton of a deployed contract.
  pub fn function_url(
    &self,
    contract_name: &str,
    execution_key: &str,
    function: &str,
  ) -> Result<Url, CheckError> {
    let mut url = self.config.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| CheckError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
      .pop_if_empty()
      .extend([
        "smart-contracts",
        contract_name,
        "clause",
        execution_key,
        "function",
        function,
        "execute",
      ]);
    Ok(url)
  }
}

#[async_trait]
impl CompletionChecker for HttpCompletionChecker {
  async fn check_completed(
    &self,
    contract_name: &str,
    execution_key: &str,
  ) -> Result<bool, CheckError> {
    let url = self.function_url(contract_name, execution_key, IS_COMPLETED_FUNCTION)?;
    debug!(%url, contract_name, execution_key, "checking automaton completion");

    let response = self
      .http
      .post(url)
      .json(&ExecutionRequest { args: &[] })
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(CheckError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let body = response.text().await?;
    let parsed: ExecutionResponse = serde_json::from_str(&body)
      .map_err(|e| CheckError::UnexpectedResponse(format!("{e}: {body}")))?;

    match parsed {
      ExecutionResponse {
        result: Some(value),
        ..
      } => Ok(value == serde_json::Value::Bool(true)),
      ExecutionResponse {
        error: Some(message),
        ..
      } => Err(CheckError::Backend(message)),
      _ => Err(CheckError::UnexpectedResponse(body)),
    }
  }
}
