use std::collections::HashSet;

use msfsm_config::{FLOW_AUTOMATON_ID, Position};
use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::ids;
use crate::status::{GlobalStatus, NodeStatus};

/// Display name of the generated flow.
pub const FLOW_NAME: &str = "Flow Déploiement";

/// Label carried by every dependency edge.
pub const EDGE_LABEL: &str = "Depends On";

/// Node kind understood by the renderer.
pub const NODE_TYPE: &str = "standard";

/// Arrowhead drawn at the end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkerType {
  #[default]
  #[serde(rename = "arrowclosed")]
  ArrowClosed,
  #[serde(rename = "arrow")]
  Arrow,
}

/// The derived deployment flow of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentFlowGraph {
  pub id: String,
  pub name: String,
  #[serde(alias = "states")]
  pub nodes: Vec<FlowNode>,
  #[serde(alias = "transitions")]
  pub edges: Vec<FlowEdge>,
  #[serde(default)]
  pub execution_metadata: ExecutionMetadata,
}

/// One automaton of the contract, as a node of the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
  pub id: String,
  pub label: String,
  pub position: Position,
  #[serde(rename = "type")]
  pub node_type: String,
  /// Id of the automaton this node stands for.
  pub automate_id: String,
  /// Key the execution backend addresses the automaton by.
  pub automata_key: String,
  #[serde(default)]
  pub execution_status: NodeStatus,
}

/// A dependency: `source` must complete before `target` may execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
  pub id: String,
  pub source: String,
  pub target: String,
  pub label: String,
  #[serde(default)]
  pub marker_end: MarkerType,
}

/// Execution tracking shared by the whole flow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
  /// Automaton ids known to be completed, in discovery order, never duplicated.
  #[serde(default)]
  pub completed_automates: Vec<String>,
  /// Correlation id of the deployed contract on the execution backend.
  #[serde(default)]
  pub contract_id: Option<String>,
  #[serde(default)]
  pub global_status: GlobalStatus,
}

impl ExecutionMetadata {
  pub fn is_completed(&self, automaton_id: &str) -> bool {
    self.completed_automates.iter().any(|id| id == automaton_id)
  }

  /// Record a completion. Returns `false` if the automaton was already recorded.
  pub fn mark_completed(&mut self, automaton_id: &str) -> bool {
    if self.is_completed(automaton_id) {
      return false;
    }
    self.completed_automates.push(automaton_id.to_string());
    true
  }
}

impl DeploymentFlowGraph {
  /// An empty flow with fresh execution metadata.
  pub fn empty() -> Self {
    Self {
      id: FLOW_AUTOMATON_ID.to_string(),
      name: FLOW_NAME.to_string(),
      nodes: Vec::new(),
      edges: Vec::new(),
      execution_metadata: ExecutionMetadata::default(),
    }
  }

  pub fn from_json(json: &str) -> Result<Self, FlowError> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn to_json_pretty(&self) -> Result<String, FlowError> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Get the node standing for an automaton.
  pub fn node_for_automaton(&self, automaton_id: &str) -> Result<&FlowNode, FlowError> {
    self
      .nodes
      .iter()
      .find(|n| n.automate_id == automaton_id)
      .ok_or_else(|| FlowError::NodeNotFound(automaton_id.to_string()))
  }

  /// Automaton ids this automaton depends on, read from the edges targeting
  /// its node, in edge order.
  pub fn dependencies_of(&self, automaton_id: &str) -> Vec<&str> {
    let target = ids::node_id(automaton_id);
    self
      .edges
      .iter()
      .filter(|e| e.target == target)
      .map(|e| ids::automaton_id_from_node_id(&e.source))
      .collect()
  }

  /// Whether every dependency of the automaton is in `completed_automates`.
  /// Vacuously true for automata without dependencies.
  pub fn dependencies_satisfied(&self, automaton_id: &str) -> bool {
    self
      .dependencies_of(automaton_id)
      .into_iter()
      .all(|dep| self.execution_metadata.is_completed(dep))
  }

  /// Recompute the global status from the current node statuses.
  pub fn recompute_global_status(&mut self) -> GlobalStatus {
    let status = GlobalStatus::from_statuses(self.nodes.iter().map(|n| n.execution_status));
    self.execution_metadata.global_status = status;
    status
  }

  /// Reset execution tracking for a fresh deployment under `contract_id`.
  ///
  /// Automata without dependencies start `Active`, every other one `Pending`.
  pub fn prepare_deployment(&mut self, contract_id: impl Into<String>) {
    let targets: HashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
    let statuses: Vec<NodeStatus> = self
      .nodes
      .iter()
      .map(|n| {
        if targets.contains(n.id.as_str()) {
          NodeStatus::Pending
        } else {
          NodeStatus::Active
        }
      })
      .collect();

    for (node, status) in self.nodes.iter_mut().zip(statuses) {
      node.execution_status = status;
    }

    self.execution_metadata = ExecutionMetadata {
      completed_automates: Vec::new(),
      contract_id: Some(contract_id.into()),
      global_status: GlobalStatus::Pending,
    };
  }

  /// Seed `completed_automates` from previously persisted ids.
  ///
  /// Ids that name no node of this flow are skipped and returned, so the
  /// caller can report drift between the stored snapshot and the graph.
  pub fn apply_completed<'a, I>(&mut self, automaton_ids: I) -> Vec<String>
  where
    I: IntoIterator<Item = &'a str>,
  {
    let known: HashSet<String> = self.nodes.iter().map(|n| n.automate_id.clone()).collect();
    let mut unknown = Vec::new();

    for id in automaton_ids {
      if known.contains(id) {
        self.execution_metadata.mark_completed(id);
      } else {
        unknown.push(id.to_string());
      }
    }

    unknown
  }
}
