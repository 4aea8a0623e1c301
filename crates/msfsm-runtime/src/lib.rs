//! Execution-status runtime for msfsm deployment flows.
//!
//! # Architecture
//!
//! ```text
//! FlowMonitor
//! ├── new(propagator, store, config, flow) - owns the current flow + generation
//! ├── restore() - seed completions from the stored snapshot
//! ├── refresh_once() - one cycle; stale results are discarded, snapshot saved
//! └── run(cancel) - poll on an interval until completed or cancelled
//!
//! StatusPropagator
//! └── refresh(flow, contract_name) -> RefreshReport
//!     - sequential completion checks, in node order
//!     - per-node status (pending / active / completed / unknown)
//!     - global status recomputed from node statuses
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use msfsm_runtime::{FlowMonitor, MonitorConfig, PropagatorConfig, StatusPropagator};
//!
//! let propagator = StatusPropagator::new(checker, PropagatorConfig::default());
//! let monitor = FlowMonitor::new(propagator, store, MonitorConfig::new("sale"), flow);
//!
//! monitor.restore().await?;
//! let status = monitor.run(cancel).await;
//! ```

mod error;
mod events;
mod monitor;
mod policy;
mod propagator;

pub use error::RuntimeError;
pub use events::{ChannelNotifier, FlowEvent, FlowNotifier, NoopNotifier};
pub use monitor::{FlowMonitor, MonitorConfig, RefreshOutcome};
pub use policy::{CheckOutcome, FailurePolicy, PropagatorConfig, Visibility};
pub use propagator::{NodeReport, RefreshReport, StatusPropagator};
