//! CLI settings: an optional JSON file, overridden by flags and environment.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use msfsm_checker::{DEFAULT_TIMEOUT_SECS, HttpCheckerConfig, RetryPolicy};
use msfsm_runtime::PropagatorConfig;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
  /// Base URL of the execution backend.
  pub api_url: String,
  pub poll_interval_ms: u64,
  pub request_timeout_secs: u64,
  pub retry: RetryPolicy,
  pub propagation: PropagatorConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      api_url: DEFAULT_API_URL.to_string(),
      poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
      request_timeout_secs: DEFAULT_TIMEOUT_SECS,
      retry: RetryPolicy::default(),
      propagation: PropagatorConfig::default(),
    }
  }
}

impl Settings {
  /// Load settings from `path`. A missing file yields the defaults.
  pub async fn load(path: &Path) -> Result<Self> {
    let content = match tokio::fs::read_to_string(path).await {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(e) => {
        return Err(e).with_context(|| format!("failed to read settings: {}", path.display()));
      }
    };

    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse settings: {}", path.display()))
  }

  /// Apply values given on the command line or through the environment.
  pub fn with_overrides(mut self, api_url: Option<String>, poll_interval_ms: Option<u64>) -> Self {
    if let Some(api_url) = api_url {
      self.api_url = api_url;
    }
    if let Some(poll_interval_ms) = poll_interval_ms {
      self.poll_interval_ms = poll_interval_ms;
    }
    self
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  pub fn checker_config(&self) -> Result<HttpCheckerConfig> {
    let base_url = Url::parse(&self.api_url)
      .with_context(|| format!("invalid api url: {}", self.api_url))?;

    Ok(HttpCheckerConfig {
      request_timeout_secs: self.request_timeout_secs,
      ..HttpCheckerConfig::new(base_url)
    })
  }
}
