//! Execution-status propagation.

use msfsm_checker::CompletionChecker;
use msfsm_flow::{DeploymentFlowGraph, FlowNode, GlobalStatus, NodeStatus};
use tracing::{debug, info, instrument, warn};

use crate::events::{FlowEvent, FlowNotifier, NoopNotifier};
use crate::policy::{CheckOutcome, FailurePolicy, PropagatorConfig, Visibility};

/// What happened to one node during a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
  pub automaton_id: String,
  pub execution_key: String,
  pub outcome: CheckOutcome,
  pub status: NodeStatus,
}

/// Result of a refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshReport {
  /// The refreshed flow. The input flow is left untouched.
  pub flow: DeploymentFlowGraph,
  /// One entry per node, in node order.
  pub nodes: Vec<NodeReport>,
  /// Automata recorded as completed for the first time in this cycle.
  pub newly_completed: Vec<String>,
}

impl RefreshReport {
  pub fn global_status(&self) -> GlobalStatus {
    self.flow.execution_metadata.global_status
  }

  /// Number of nodes whose check failed.
  pub fn failed_checks(&self) -> usize {
    self
      .nodes
      .iter()
      .filter(|n| matches!(n.outcome, CheckOutcome::Failed(_)))
      .count()
  }
}

/// Refreshes the per-node and global statuses of a deployment flow.
///
/// Generic over `N: FlowNotifier`. Use `StatusPropagator::new()` for a
/// propagator with no-op notifications, or `with_notifier()` to observe events.
pub struct StatusPropagator<C: CompletionChecker, N: FlowNotifier = NoopNotifier> {
  checker: C,
  config: PropagatorConfig,
  notifier: N,
}

impl<C: CompletionChecker> StatusPropagator<C, NoopNotifier> {
  pub fn new(checker: C, config: PropagatorConfig) -> Self {
    Self::with_notifier(checker, config, NoopNotifier)
  }
}

impl<C: CompletionChecker, N: FlowNotifier> StatusPropagator<C, N> {
  pub fn with_notifier(checker: C, config: PropagatorConfig, notifier: N) -> Self {
    Self {
      checker,
      config,
      notifier,
    }
  }

  pub fn config(&self) -> &PropagatorConfig {
    &self.config
  }

  pub fn notifier(&self) -> &N {
    &self.notifier
  }

  pub fn checker(&self) -> &C {
    &self.checker
  }

  /// Run one refresh cycle over `flow` for the deployed contract
  /// `contract_name`.
  ///
  /// Nodes are checked one after the other, in node order. A failed check
  /// never aborts the cycle.
  #[instrument(
    name = "flow_refresh",
    skip(self, flow),
    fields(nodes = flow.nodes.len(), visibility = ?self.config.visibility)
  )]
  pub async fn refresh(&self, flow: &DeploymentFlowGraph, contract_name: &str) -> RefreshReport {
    self.notifier.notify(FlowEvent::RefreshStarted {
      contract_name: contract_name.to_string(),
      nodes: flow.nodes.len(),
    });

    let mut next = flow.clone();
    let already_completed = next.execution_metadata.completed_automates.len();
    let mut outcomes = Vec::with_capacity(next.nodes.len());

    match self.config.visibility {
      Visibility::InPass => {
        for index in 0..next.nodes.len() {
          let outcome = self.check(contract_name, &next.nodes[index]).await;
          self.apply(&mut next, index, &outcome);
          outcomes.push(outcome);
        }
      }
      Visibility::Settled => {
        for node in &next.nodes {
          outcomes.push(self.check(contract_name, node).await);
        }
        for (node, outcome) in next.nodes.iter().zip(&outcomes) {
          if outcome.is_completed() {
            next.execution_metadata.mark_completed(&node.automate_id);
          }
        }
        for (index, outcome) in outcomes.iter().enumerate() {
          self.apply(&mut next, index, outcome);
        }
      }
    }

    let global_status = next.recompute_global_status();
    let newly_completed = next.execution_metadata.completed_automates[already_completed..].to_vec();

    let nodes: Vec<NodeReport> = next
      .nodes
      .iter()
      .zip(outcomes)
      .map(|(node, outcome)| NodeReport {
        automaton_id: node.automate_id.clone(),
        execution_key: node.automata_key.clone(),
        outcome,
        status: node.execution_status,
      })
      .collect();

    for (before, after) in flow.nodes.iter().zip(&next.nodes) {
      if before.execution_status != after.execution_status {
        self.notifier.notify(FlowEvent::NodeStatusChanged {
          automaton_id: after.automate_id.clone(),
          from: before.execution_status,
          to: after.execution_status,
        });
      }
    }

    let completed = next
      .nodes
      .iter()
      .filter(|n| n.execution_status.is_completed())
      .count();

    info!(
      contract_name,
      %global_status,
      completed,
      total = next.nodes.len(),
      newly_completed = ?newly_completed,
      "flow refreshed"
    );

    self.notifier.notify(FlowEvent::RefreshCompleted {
      global_status,
      completed,
      total: next.nodes.len(),
    });

    RefreshReport {
      flow: next,
      nodes,
      newly_completed,
    }
  }

  /// Ask the backend about one node. Failures are logged, reported and
  /// returned as data.
  async fn check(&self, contract_name: &str, node: &FlowNode) -> CheckOutcome {
    match self
      .checker
      .check_completed(contract_name, &node.automata_key)
      .await
    {
      Ok(true) => CheckOutcome::Completed,
      Ok(false) => CheckOutcome::NotCompleted,
      Err(e) => {
        warn!(
          contract_name,
          automaton_id = %node.automate_id,
          execution_key = %node.automata_key,
          error = %e,
          "completion check failed"
        );
        self.notifier.notify(FlowEvent::CheckFailed {
          automaton_id: node.automate_id.clone(),
          execution_key: node.automata_key.clone(),
          error: e.to_string(),
        });
        CheckOutcome::Failed(e.to_string())
      }
    }
  }

  /// Set the status of the node at `index` from its check outcome and the
  /// completions currently recorded on `flow`.
  fn apply(&self, flow: &mut DeploymentFlowGraph, index: usize, outcome: &CheckOutcome) {
    let automaton_id = flow.nodes[index].automate_id.clone();

    let status = match outcome {
      CheckOutcome::Completed => {
        flow.execution_metadata.mark_completed(&automaton_id);
        NodeStatus::Completed
      }
      CheckOutcome::Failed(_) if self.config.failure_policy == FailurePolicy::MarkUnknown => {
        NodeStatus::Unknown
      }
      CheckOutcome::NotCompleted | CheckOutcome::Failed(_) => {
        if flow.dependencies_satisfied(&automaton_id) {
          NodeStatus::Active
        } else {
          NodeStatus::Pending
        }
      }
    };

    debug!(automaton_id = %automaton_id, %status, "node status resolved");
    flow.nodes[index].execution_status = status;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use msfsm_checker::CheckError;
  use msfsm_config::{AutomatonDef, TransitionDef};
  use msfsm_flow::generate;

  /// Completes the listed execution keys, fails on `Automata9`.
  struct Fixed(&'static [&'static str]);

  #[async_trait]
  impl CompletionChecker for Fixed {
    async fn check_completed(&self, _: &str, key: &str) -> Result<bool, CheckError> {
      if key == "Automata9" {
        return Err(CheckError::Backend("boom".to_string()));
      }
      Ok(self.0.contains(&key))
    }
  }

  fn pair() -> DeploymentFlowGraph {
    generate(&[
      AutomatonDef::new("A", "Payment"),
      AutomatonDef::new("B", "Delivery")
        .with_transition(TransitionDef::new("t", "s0", "s1").depends_on(["A"])),
    ])
  }

  #[tokio::test]
  async fn test_refresh_leaves_input_untouched() {
    let flow = pair();
    let propagator = StatusPropagator::new(Fixed(&["Automata0"]), PropagatorConfig::default());

    let report = propagator.refresh(&flow, "sale").await;

    assert_eq!(flow, pair());
    assert_eq!(report.flow.nodes[0].execution_status, NodeStatus::Completed);
    assert_eq!(report.flow.nodes[1].execution_status, NodeStatus::Active);
    assert_eq!(report.newly_completed, vec!["A".to_string()]);
    assert_eq!(report.global_status(), GlobalStatus::InProgress);
  }

  #[tokio::test]
  async fn test_second_refresh_reports_nothing_new() {
    let propagator = StatusPropagator::new(Fixed(&["Automata0"]), PropagatorConfig::default());

    let first = propagator.refresh(&pair(), "sale").await;
    let second = propagator.refresh(&first.flow, "sale").await;

    assert!(second.newly_completed.is_empty());
    assert_eq!(
      second.flow.execution_metadata.completed_automates,
      vec!["A".to_string()]
    );
  }

  #[tokio::test]
  async fn test_failed_check_report() {
    let mut flow = pair();
    flow.nodes[1].automata_key = "Automata9".to_string();
    let propagator = StatusPropagator::new(Fixed(&[]), PropagatorConfig::default());

    let report = propagator.refresh(&flow, "sale").await;

    assert_eq!(report.failed_checks(), 1);
    assert_eq!(
      report.nodes[1].outcome,
      CheckOutcome::Failed("backend error: boom".to_string())
    );
    assert_eq!(report.nodes[1].status, NodeStatus::Pending);
  }
}
