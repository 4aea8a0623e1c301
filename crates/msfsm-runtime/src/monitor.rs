//! Polling monitor owning the current flow of a deployed contract.

use std::time::Duration;

use msfsm_checker::CompletionChecker;
use msfsm_flow::{DeploymentFlowGraph, GlobalStatus, NodeStatus};
use msfsm_store::{FlowSnapshot, SnapshotStore, load_for, save_metadata};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::RuntimeError;
use crate::events::{FlowEvent, FlowNotifier, NoopNotifier};
use crate::propagator::{RefreshReport, StatusPropagator};

/// Default delay between two refresh cycles: 5 seconds.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for a [`FlowMonitor`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
  /// Name of the deployed contract on the execution backend.
  pub contract_name: String,
  /// Delay between two refresh cycles. Zero means the default.
  pub poll_interval: Duration,
  /// Stop polling once every automaton is completed.
  pub stop_when_completed: bool,
}

impl MonitorConfig {
  pub fn new(contract_name: impl Into<String>) -> Self {
    Self {
      contract_name: contract_name.into(),
      poll_interval: DEFAULT_POLL_INTERVAL,
      stop_when_completed: true,
    }
  }

  pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
    self.poll_interval = poll_interval;
    self
  }

  /// Returns the effective poll interval, using the default if zero.
  pub fn effective_poll_interval(&self) -> Duration {
    if self.poll_interval.is_zero() {
      DEFAULT_POLL_INTERVAL
    } else {
      self.poll_interval
    }
  }
}

/// Result of [`FlowMonitor::refresh_once`].
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
  /// The refreshed flow replaced the current one.
  Applied {
    report: RefreshReport,
    /// `None` when the flow carries no contract id.
    snapshot: Option<FlowSnapshot>,
  },
  /// The flow was replaced while the refresh was running; its result was
  /// dropped. `generation` is the one the refresh started from.
  Discarded { generation: u64 },
}

struct MonitorState {
  flow: DeploymentFlowGraph,
  generation: u64,
}

/// Keeps the flow of one deployed contract up to date.
///
/// At most one refresh runs at a time. Replacing the graph bumps a
/// generation counter; a refresh that started from an older generation is
/// discarded instead of overwriting the new graph.
pub struct FlowMonitor<C, S, N = NoopNotifier>
where
  C: CompletionChecker,
  S: SnapshotStore,
  N: FlowNotifier,
{
  propagator: StatusPropagator<C, N>,
  store: S,
  config: MonitorConfig,
  state: Mutex<MonitorState>,
  refresh_lock: Mutex<()>,
}

impl<C, S, N> FlowMonitor<C, S, N>
where
  C: CompletionChecker,
  S: SnapshotStore,
  N: FlowNotifier,
{
  pub fn new(
    propagator: StatusPropagator<C, N>,
    store: S,
    config: MonitorConfig,
    flow: DeploymentFlowGraph,
  ) -> Self {
    Self {
      propagator,
      store,
      config,
      state: Mutex::new(MonitorState {
        flow,
        generation: 0,
      }),
      refresh_lock: Mutex::new(()),
    }
  }

  pub fn config(&self) -> &MonitorConfig {
    &self.config
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn propagator(&self) -> &StatusPropagator<C, N> {
    &self.propagator
  }

  /// A copy of the current flow.
  pub async fn flow(&self) -> DeploymentFlowGraph {
    self.state.lock().await.flow.clone()
  }

  /// Global status of the current flow.
  pub async fn global_status(&self) -> GlobalStatus {
    self.state.lock().await.flow.execution_metadata.global_status
  }

  pub async fn generation(&self) -> u64 {
    self.state.lock().await.generation
  }

  /// Replace the monitored flow, e.g. after the contract was edited.
  /// Returns the new generation.
  pub async fn replace_graph(&self, flow: DeploymentFlowGraph) -> u64 {
    let mut state = self.state.lock().await;
    state.flow = flow;
    state.generation += 1;
    debug!(generation = state.generation, "flow graph replaced");
    state.generation
  }

  /// Current status of one automaton.
  pub async fn status_of(&self, automaton_id: &str) -> Result<NodeStatus, RuntimeError> {
    let state = self.state.lock().await;
    Ok(state.flow.node_for_automaton(automaton_id)?.execution_status)
  }

  /// Seed the current flow with the completions of the last saved snapshot.
  ///
  /// Completed automata are marked completed and the global status is
  /// recomputed. Snapshot entries naming no automaton of the flow are
  /// skipped with a warning. Returns `None` when nothing was applied, which
  /// includes a graph replaced while the snapshot was being read.
  pub async fn restore(&self) -> Result<Option<FlowSnapshot>, RuntimeError> {
    let (contract_id, generation) = {
      let state = self.state.lock().await;
      (
        state.flow.execution_metadata.contract_id.clone(),
        state.generation,
      )
    };

    let Some(snapshot) = load_for(&self.store, contract_id.as_deref()).await? else {
      debug!(contract_id = ?contract_id, "no snapshot to restore");
      return Ok(None);
    };

    let mut state = self.state.lock().await;
    if state.generation != generation {
      info!(
        contract_id = ?contract_id,
        stale = generation,
        current = state.generation,
        "flow replaced during restore, snapshot not applied"
      );
      return Ok(None);
    }

    let unknown = state
      .flow
      .apply_completed(snapshot.completed_automates.iter().map(String::as_str));
    if !unknown.is_empty() {
      warn!(
        contract_id = ?contract_id,
        unknown = ?unknown,
        "snapshot names automata missing from the flow"
      );
    }

    let flow = &mut state.flow;
    for node in flow.nodes.iter_mut() {
      if flow.execution_metadata.is_completed(&node.automate_id) {
        node.execution_status = NodeStatus::Completed;
      }
    }
    let global_status = flow.recompute_global_status();

    info!(
      contract_id = ?contract_id,
      %global_status,
      completed = flow.execution_metadata.completed_automates.len(),
      last_updated = %snapshot.last_updated,
      "execution snapshot restored"
    );

    Ok(Some(snapshot))
  }

  /// Run one refresh cycle and persist the result.
  ///
  /// Fails with [`RuntimeError::RefreshInProgress`] when another cycle is
  /// running. The refreshed flow is applied before the snapshot is saved, so
  /// a storage error leaves the in-memory flow up to date.
  pub async fn refresh_once(&self) -> Result<RefreshOutcome, RuntimeError> {
    let _guard = self
      .refresh_lock
      .try_lock()
      .map_err(|_| RuntimeError::RefreshInProgress)?;

    let (flow, generation) = {
      let state = self.state.lock().await;
      (state.flow.clone(), state.generation)
    };

    let report = self
      .propagator
      .refresh(&flow, &self.config.contract_name)
      .await;

    {
      let mut state = self.state.lock().await;
      if state.generation != generation {
        info!(
          stale = generation,
          current = state.generation,
          "flow replaced during refresh, discarding result"
        );
        self
          .propagator
          .notifier()
          .notify(FlowEvent::RefreshDiscarded { generation });
        return Ok(RefreshOutcome::Discarded { generation });
      }
      state.flow = report.flow.clone();
    }

    let snapshot = save_metadata(&self.store, &report.flow.execution_metadata).await?;
    if let Some(snapshot) = &snapshot
      && let Some(contract_id) = report.flow.execution_metadata.contract_id.as_deref()
    {
      debug!(contract_id, "execution snapshot saved");
      self.propagator.notifier().notify(FlowEvent::SnapshotSaved {
        contract_id: contract_id.to_string(),
        global_status: snapshot.global_status,
      });
    }

    Ok(RefreshOutcome::Applied { report, snapshot })
  }

  /// Refresh on every tick of the poll interval until cancelled, or until
  /// the flow is completed when `stop_when_completed` is set.
  ///
  /// The first cycle runs immediately. Failing cycles are logged and the
  /// loop keeps polling. Returns the global status of the current flow.
  pub async fn run(&self, cancel: CancellationToken) -> GlobalStatus {
    let poll_interval = self.config.effective_poll_interval();
    info!(
      contract_name = %self.config.contract_name,
      poll_interval_ms = poll_interval.as_millis() as u64,
      "starting flow monitor"
    );

    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          info!(contract_name = %self.config.contract_name, "flow monitor cancelled");
          break;
        }
        _ = interval.tick() => {}
      }

      let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          info!(contract_name = %self.config.contract_name, "flow monitor cancelled");
          break;
        }
        outcome = self.refresh_once() => outcome,
      };

      match outcome {
        Ok(_) => {}
        Err(RuntimeError::RefreshInProgress) => {
          debug!("refresh already running, skipping tick");
        }
        Err(e) => {
          warn!(
            contract_name = %self.config.contract_name,
            error = %e,
            "refresh cycle failed"
          );
        }
      }

      if self.config.stop_when_completed && self.global_status().await == GlobalStatus::Completed {
        info!(contract_name = %self.config.contract_name, "flow completed");
        break;
      }
    }

    self.global_status().await
  }
}
