use chrono::{DateTime, Utc};
use msfsm_flow::{ExecutionMetadata, GlobalStatus};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Prefix of every snapshot storage key.
pub const STORAGE_KEY_PREFIX: &str = "flow_execution_";

/// `flow_execution_<contractId>`
pub fn storage_key(contract_id: &str) -> String {
  format!("{STORAGE_KEY_PREFIX}{contract_id}")
}

/// Persisted execution state of a deployment flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
  pub completed_automates: Vec<String>,
  pub global_status: GlobalStatus,
  #[serde(with = "millis_rfc3339")]
  pub last_updated: DateTime<Utc>,
}

impl FlowSnapshot {
  /// Capture the metadata at the given instant.
  pub fn capture(metadata: &ExecutionMetadata, at: DateTime<Utc>) -> Self {
    Self {
      completed_automates: metadata.completed_automates.clone(),
      global_status: metadata.global_status,
      last_updated: at,
    }
  }

  /// Whether two snapshots describe the same execution state, ignoring when
  /// they were taken.
  pub fn same_state(&self, other: &FlowSnapshot) -> bool {
    self.completed_automates == other.completed_automates
      && self.global_status == other.global_status
  }

  pub(crate) fn encode(&self) -> Result<String, StoreError> {
    Ok(serde_json::to_string(self)?)
  }

  pub(crate) fn decode(raw: &str) -> Result<Self, StoreError> {
    Ok(serde_json::from_str(raw)?)
  }
}

/// `2024-01-01T00:00:00.000Z`: UTC, millisecond precision.
mod millis_rfc3339 {
  use chrono::{DateTime, SecondsFormat, Utc};
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_storage_key() {
    assert_eq!(storage_key("sale-2024"), "flow_execution_sale-2024");
  }

  #[test]
  fn test_wire_format() {
    let snapshot = FlowSnapshot {
      completed_automates: vec!["01".to_string(), "02".to_string()],
      global_status: GlobalStatus::InProgress,
      last_updated: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    };

    assert_eq!(
      snapshot.encode().unwrap(),
      r#"{"completedAutomates":["01","02"],"globalStatus":"in_progress","lastUpdated":"2024-01-01T00:00:00.000Z"}"#
    );
  }

  #[test]
  fn test_decode_editor_snapshot() {
    let raw = r#"{"completedAutomates":["01"],"globalStatus":"pending","lastUpdated":"2024-03-05T10:20:30.123Z"}"#;
    let snapshot = FlowSnapshot::decode(raw).unwrap();

    assert_eq!(snapshot.completed_automates, vec!["01".to_string()]);
    assert_eq!(snapshot.global_status, GlobalStatus::Pending);
    assert_eq!(snapshot.last_updated.timestamp_subsec_millis(), 123);
  }

  #[test]
  fn test_decode_rejects_bad_timestamp() {
    let raw = r#"{"completedAutomates":[],"globalStatus":"pending","lastUpdated":"yesterday"}"#;
    assert!(matches!(FlowSnapshot::decode(raw), Err(StoreError::Parse(_))));
  }
}
