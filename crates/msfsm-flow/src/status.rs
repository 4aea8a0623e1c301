use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution status of a single automaton in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
  /// Not completed and at least one dependency is still outstanding.
  #[default]
  Pending,
  /// Not completed, every dependency completed: ready to execute.
  Active,
  /// The backend reports the automaton as completed.
  Completed,
  /// The completion check kept failing. Only produced when failures are
  /// surfaced instead of being treated as "not completed".
  Unknown,
}

impl NodeStatus {
  pub fn is_completed(self) -> bool {
    self == NodeStatus::Completed
  }

  pub fn as_str(self) -> &'static str {
    match self {
      NodeStatus::Pending => "pending",
      NodeStatus::Active => "active",
      NodeStatus::Completed => "completed",
      NodeStatus::Unknown => "unknown",
    }
  }
}

impl fmt::Display for NodeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Aggregate status of the whole flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalStatus {
  #[default]
  Pending,
  InProgress,
  Completed,
}

impl GlobalStatus {
  /// Aggregate node statuses.
  ///
  /// No completed node (including an empty flow) is `Pending`, all completed is
  /// `Completed`, anything in between is `InProgress`.
  pub fn from_statuses<I>(statuses: I) -> Self
  where
    I: IntoIterator<Item = NodeStatus>,
  {
    let (total, completed) = statuses
      .into_iter()
      .fold((0usize, 0usize), |(total, completed), status| {
        (total + 1, completed + usize::from(status.is_completed()))
      });

    if completed == 0 {
      GlobalStatus::Pending
    } else if completed == total {
      GlobalStatus::Completed
    } else {
      GlobalStatus::InProgress
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      GlobalStatus::Pending => "pending",
      GlobalStatus::InProgress => "in_progress",
      GlobalStatus::Completed => "completed",
    }
  }

  /// Rank used to compare progress: pending < in_progress < completed.
  pub fn rank(self) -> u8 {
    match self {
      GlobalStatus::Pending => 0,
      GlobalStatus::InProgress => 1,
      GlobalStatus::Completed => 2,
    }
  }
}

impl fmt::Display for GlobalStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_flow_is_pending() {
    assert_eq!(GlobalStatus::from_statuses(Vec::new()), GlobalStatus::Pending);
  }

  #[test]
  fn test_global_status_rules() {
    use NodeStatus::*;

    assert_eq!(
      GlobalStatus::from_statuses([Pending, Active, Unknown]),
      GlobalStatus::Pending
    );
    assert_eq!(
      GlobalStatus::from_statuses([Completed, Active]),
      GlobalStatus::InProgress
    );
    assert_eq!(
      GlobalStatus::from_statuses([Completed, Completed]),
      GlobalStatus::Completed
    );
  }

  #[test]
  fn test_wire_names() {
    assert_eq!(
      serde_json::to_string(&GlobalStatus::InProgress).unwrap(),
      r#""in_progress""#
    );
    assert_eq!(
      serde_json::to_string(&NodeStatus::Active).unwrap(),
      r#""active""#
    );
    assert_eq!(GlobalStatus::InProgress.to_string(), "in_progress");
  }
}
