//! Msfsm Flow
//!
//! This crate provides the deployment flow of a contract: a derived graph with
//! one node per automaton and one edge per declared dependency, read as
//! "the source automaton must complete before the target may execute".
//!
//! Key differences from the editor's automata in `msfsm-config`:
//! - Nodes are automata, not states; edges are dependencies, not transitions
//! - Node and edge ids are derived from automaton ids, so regenerating from the
//!   same contract always yields the same ids
//! - Each node carries execution tracking (execution key + status) and the graph
//!   carries execution metadata (completed automata, global status)
//!
//! The graph is a snapshot: any change to the source automata requires calling
//! [`generate`] again. Only the execution-tracking fields are updated afterwards.

mod error;
mod flow;
mod generate;
pub mod ids;
mod status;

pub use error::FlowError;
pub use flow::{
  DeploymentFlowGraph, EDGE_LABEL, ExecutionMetadata, FLOW_NAME, FlowEdge, FlowNode, MarkerType,
  NODE_TYPE,
};
pub use generate::{generate, generate_for_contract};
pub use msfsm_config::{FLOW_AUTOMATON_ID, Position};
pub use status::{GlobalStatus, NodeStatus};
