use std::collections::{HashMap, HashSet};

use msfsm_config::{AutomatonDef, ContractDef, FLOW_AUTOMATON_ID, Position};
use tracing::debug;

use crate::flow::{
  DeploymentFlowGraph, EDGE_LABEL, ExecutionMetadata, FLOW_NAME, FlowEdge, FlowNode, MarkerType,
  NODE_TYPE,
};
use crate::ids;
use crate::status::NodeStatus;

const ORIGIN_X: f64 = 200.0;
const ORIGIN_Y: f64 = 200.0;
const SPACING_X: f64 = 300.0;

/// Derive the deployment flow from a contract's automata.
///
/// Every automaton except the flow itself becomes a node, laid out left to
/// right in input order. Every dependency declared on a transition becomes an
/// edge from the dependency to the automaton owning the transition.
/// References carrying only a name resolve to the first automaton with that
/// name. Dependencies naming an automaton that is absent (or is the flow
/// itself) are dropped.
pub fn generate(automata: &[AutomatonDef]) -> DeploymentFlowGraph {
  let sources: Vec<&AutomatonDef> = automata.iter().filter(|a| !a.is_flow()).collect();

  let mut node_ids: HashMap<&str, String> = HashMap::with_capacity(sources.len());
  let mut ids_by_name: HashMap<&str, &str> = HashMap::with_capacity(sources.len());
  let mut nodes = Vec::with_capacity(sources.len());

  for (index, automaton) in sources.iter().enumerate() {
    let node_id = ids::node_id(&automaton.id);
    node_ids.insert(automaton.id.as_str(), node_id.clone());
    ids_by_name
      .entry(automaton.name.as_str())
      .or_insert(automaton.id.as_str());

    nodes.push(FlowNode {
      id: node_id,
      label: automaton.name.clone(),
      position: Position::new(ORIGIN_X + index as f64 * SPACING_X, ORIGIN_Y),
      node_type: NODE_TYPE.to_string(),
      automate_id: automaton.id.clone(),
      automata_key: ids::execution_key(index),
      execution_status: NodeStatus::Pending,
    });
  }

  let mut edges = Vec::new();
  let mut seen = HashSet::new();

  for target in &sources {
    let Some(target_node) = node_ids.get(target.id.as_str()) else {
      continue;
    };

    for dependency in target.dependencies() {
      let resolved = dependency
        .automaton_id()
        .or_else(|| dependency.name().and_then(|name| ids_by_name.get(name).copied()));

      let Some((dependency_id, source_node)) =
        resolved.and_then(|id| node_ids.get(id).map(|node| (id, node)))
      else {
        debug!(
          automaton_id = %target.id,
          ?dependency,
          "dropping dependency on unknown automaton"
        );
        continue;
      };

      let edge_id = ids::edge_id(dependency_id, &target.id);
      if !seen.insert(edge_id.clone()) {
        continue;
      }

      edges.push(FlowEdge {
        id: edge_id,
        source: source_node.clone(),
        target: target_node.clone(),
        label: EDGE_LABEL.to_string(),
        marker_end: MarkerType::ArrowClosed,
      });
    }
  }

  debug!(
    nodes = nodes.len(),
    edges = edges.len(),
    "generated deployment flow"
  );

  DeploymentFlowGraph {
    id: FLOW_AUTOMATON_ID.to_string(),
    name: FLOW_NAME.to_string(),
    nodes,
    edges,
    execution_metadata: ExecutionMetadata::default(),
  }
}

/// Derive the deployment flow of a whole contract.
///
/// The flow's correlation id is left unset; it is assigned when the contract
/// is deployed (see [`DeploymentFlowGraph::prepare_deployment`]).
pub fn generate_for_contract(contract: &ContractDef) -> DeploymentFlowGraph {
  generate(&contract.automates)
}
