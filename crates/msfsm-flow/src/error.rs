use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("failed to parse deployment flow: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("no flow node for automaton: {0}")]
  NodeNotFound(String),
}
