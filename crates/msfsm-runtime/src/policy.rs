use serde::{Deserialize, Serialize};

/// Result of one completion check, as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
  Completed,
  NotCompleted,
  /// The check itself failed; carries the error message.
  Failed(String),
}

impl CheckOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, CheckOutcome::Completed)
  }
}

/// How a failed completion check affects the node's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
  /// Treat the failure exactly like "not completed": the node ends up
  /// `pending` or `active` depending on its dependencies.
  #[default]
  FailOpen,
  /// Mark the node `unknown` so backend outages stay visible.
  MarkUnknown,
}

/// Which completions a node's `active` evaluation can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
  /// Evaluate each node right after its own check, against completions
  /// discovered so far. Completions found later in the same cycle are not
  /// seen, so the result depends on node order.
  InPass,
  /// Run every check first, then evaluate all nodes against the completions
  /// of the whole cycle. Independent of node order.
  #[default]
  Settled,
}

/// Configuration for the status propagator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropagatorConfig {
  pub failure_policy: FailurePolicy,
  pub visibility: Visibility,
}
