//! Textual id conventions of the deployment flow.
//!
//! Renderers, fixtures and the status propagator all depend on these exact
//! formats. Node ids and automaton ids are converted back and forth only
//! through this module.

/// Prefix of every flow node id.
pub const NODE_ID_PREFIX: &str = "deployment-state-";

/// Prefix of every execution key.
pub const EXECUTION_KEY_PREFIX: &str = "Automata";

/// `deployment-state-<automatonId>`
pub fn node_id(automaton_id: &str) -> String {
  format!("{NODE_ID_PREFIX}{automaton_id}")
}

/// `deployment-edge-<depId>-to-<targetId>`
pub fn edge_id(dependency_id: &str, target_id: &str) -> String {
  format!("deployment-edge-{dependency_id}-to-{target_id}")
}

/// `Automata<index>`, the name the execution backend knows an automaton by.
pub fn execution_key(index: usize) -> String {
  format!("{EXECUTION_KEY_PREFIX}{index}")
}

/// Recover the automaton id from a node id.
///
/// Ids that do not carry the node prefix are returned unchanged.
pub fn automaton_id_from_node_id(node_id: &str) -> &str {
  node_id.strip_prefix(NODE_ID_PREFIX).unwrap_or(node_id)
}
