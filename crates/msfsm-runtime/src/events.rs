//! Flow events and notifiers.
//!
//! Events are emitted while statuses are refreshed so that consumers can
//! surface progress and failures (toasts, logs, websockets) without the
//! runtime knowing about any of them.

use msfsm_flow::{GlobalStatus, NodeStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during status refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
  /// A refresh cycle has started.
  RefreshStarted { contract_name: String, nodes: usize },

  /// The completion check of an automaton failed.
  CheckFailed {
    automaton_id: String,
    execution_key: String,
    error: String,
  },

  /// An automaton's status differs from the previous cycle.
  NodeStatusChanged {
    automaton_id: String,
    from: NodeStatus,
    to: NodeStatus,
  },

  /// A refresh cycle has finished.
  RefreshCompleted {
    global_status: GlobalStatus,
    completed: usize,
    total: usize,
  },

  /// A refresh finished after the flow was replaced; its result was dropped.
  RefreshDiscarded { generation: u64 },

  /// The execution snapshot was persisted.
  SnapshotSaved {
    contract_id: String,
    global_status: GlobalStatus,
  },
}

/// Trait for receiving flow events.
///
/// The runtime calls `notify` for each event; implementations decide what to
/// do with them.
pub trait FlowNotifier: Send + Sync {
  fn notify(&self, event: FlowEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl FlowNotifier for NoopNotifier {
  fn notify(&self, _event: FlowEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // NOTE: unbounded; a refresh never waits on the consumer. At most a few
  // events per node per cycle.
  sender: mpsc::UnboundedSender<FlowEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<FlowEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<FlowEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl FlowNotifier for ChannelNotifier {
  fn notify(&self, event: FlowEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_channel_notifier_delivers_in_order() {
    let (notifier, mut receiver) = ChannelNotifier::channel();

    notifier.notify(FlowEvent::RefreshStarted {
      contract_name: "sale".to_string(),
      nodes: 2,
    });
    notifier.notify(FlowEvent::RefreshDiscarded { generation: 3 });

    assert!(matches!(
      receiver.try_recv(),
      Ok(FlowEvent::RefreshStarted { nodes: 2, .. })
    ));
    assert_eq!(
      receiver.try_recv().unwrap(),
      FlowEvent::RefreshDiscarded { generation: 3 }
    );
  }

  #[test]
  fn test_send_after_receiver_dropped() {
    let (notifier, receiver) = ChannelNotifier::channel();
    drop(receiver);
    notifier.notify(FlowEvent::RefreshDiscarded { generation: 1 });
  }

  #[test]
  fn test_event_json_shape() {
    let event = FlowEvent::NodeStatusChanged {
      automaton_id: "01".to_string(),
      from: NodeStatus::Pending,
      to: NodeStatus::Active,
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event"], "node_status_changed");
    assert_eq!(value["to"], "active");
  }
}
