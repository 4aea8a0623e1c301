//! Msfsm Config
//!
//! This crate contains the serializable contract definitions produced by the
//! contract editor. A contract is a set of automata (one per clause), each with
//! its own states and transitions. Transitions may declare dependencies on
//! other automata of the same contract.
//!
//! These types are the input of the deployment-flow generator in `msfsm-flow`.
//! They are loaded from:
//! - JSON files exported by the editor (via CLI with `msfsm generate contract.json`)
//! - API payloads (as JSON blobs)

mod automaton;
mod contract;
mod dependency;
mod error;

pub use automaton::{AutomatonDef, FLOW_AUTOMATON_ID, Position, StateDef, TransitionDef};
pub use contract::ContractDef;
pub use dependency::DependencyRef;
pub use error::ConfigError;
