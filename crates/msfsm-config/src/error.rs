use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse contract definition: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("automaton not found: {0}")]
  AutomatonNotFound(String),
}
