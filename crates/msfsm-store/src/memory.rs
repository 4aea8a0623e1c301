use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use msfsm_flow::ExecutionMetadata;
use tokio::sync::RwLock;

use crate::snapshot::{FlowSnapshot, storage_key};
use crate::{SnapshotStore, StoreError};

/// In-memory snapshot store.
///
/// Entries are kept as encoded JSON under their storage key, exactly as a
/// browser's local storage would hold them. Suitable for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
  entries: RwLock<HashMap<String, String>>,
}

impl InMemorySnapshotStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store raw text under a contract's key, bypassing encoding.
  pub async fn put_raw(&self, contract_id: &str, raw: impl Into<String>) {
    self
      .entries
      .write()
      .await
      .insert(storage_key(contract_id), raw.into());
  }

  /// Raw text stored under a contract's key.
  pub async fn get_raw(&self, contract_id: &str) -> Option<String> {
    self
      .entries
      .read()
      .await
      .get(&storage_key(contract_id))
      .cloned()
  }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
  async fn save(
    &self,
    contract_id: &str,
    metadata: &ExecutionMetadata,
  ) -> Result<FlowSnapshot, StoreError> {
    if contract_id.is_empty() {
      return Err(StoreError::MissingContractId);
    }

    let snapshot = FlowSnapshot::capture(metadata, Utc::now());
    let raw = snapshot.encode()?;
    self
      .entries
      .write()
      .await
      .insert(storage_key(contract_id), raw);
    Ok(snapshot)
  }

  async fn load(&self, contract_id: &str) -> Result<Option<FlowSnapshot>, StoreError> {
    if contract_id.is_empty() {
      return Ok(None);
    }

    match self.get_raw(contract_id).await {
      Some(raw) => FlowSnapshot::decode(&raw).map(Some),
      None => Ok(None),
    }
  }

  async fn delete(&self, contract_id: &str) -> Result<(), StoreError> {
    self.entries.write().await.remove(&storage_key(contract_id));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use msfsm_flow::GlobalStatus;

  fn metadata() -> ExecutionMetadata {
    ExecutionMetadata {
      completed_automates: vec!["01".to_string()],
      contract_id: Some("sale".to_string()),
      global_status: GlobalStatus::InProgress,
    }
  }

  #[tokio::test]
  async fn test_in_memory_round_trip() {
    let store = InMemorySnapshotStore::new();

    assert_eq!(store.load("sale").await.unwrap(), None);

    let saved = store.save("sale", &metadata()).await.unwrap();
    let loaded = store.load("sale").await.unwrap().unwrap();
    assert!(loaded.same_state(&saved));
    assert!(store.get_raw("sale").await.unwrap().contains("\"in_progress\""));

    store.delete("sale").await.unwrap();
    assert_eq!(store.load("sale").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_unset_contract_id() {
    let store = InMemorySnapshotStore::new();

    assert_eq!(store.load("").await.unwrap(), None);
    assert!(matches!(
      store.save("", &metadata()).await,
      Err(StoreError::MissingContractId)
    ));
  }

  #[tokio::test]
  async fn test_malformed_entry_propagates() {
    let store = InMemorySnapshotStore::new();
    store.put_raw("sale", "{ truncated").await;

    assert!(matches!(store.load("sale").await, Err(StoreError::Parse(_))));
  }
}
