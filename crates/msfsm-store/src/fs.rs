use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use msfsm_flow::ExecutionMetadata;
use tokio::fs;
use tracing::debug;

use crate::snapshot::{FlowSnapshot, storage_key};
use crate::{SnapshotStore, StoreError};

/// Filesystem-based snapshot store.
///
/// Each contract's snapshot lives in its own file named after its storage key:
/// ```text
/// {root}/
/// ├── flow_execution_sale-2024.json
/// └── flow_execution_acme%2Flease.json   (contract id "acme/lease")
/// ```
///
/// `%`, `/` and `\` in contract ids are percent-encoded, so two distinct ids
/// never share a file.
pub struct FsSnapshotStore {
  root: PathBuf,
}

impl FsSnapshotStore {
  /// Create a new store rooted at the given directory. The directory is
  /// created on first save.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the store.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Path of the file holding a contract's snapshot.
  pub fn snapshot_path(&self, contract_id: &str) -> PathBuf {
    let file_name = format!("{}.json", escape_file_name(&storage_key(contract_id)));
    self.root.join(file_name)
  }
}

fn escape_file_name(key: &str) -> String {
  let mut escaped = String::with_capacity(key.len());
  for c in key.chars() {
    match c {
      '%' => escaped.push_str("%25"),
      '/' => escaped.push_str("%2F"),
      '\\' => escaped.push_str("%5C"),
      c => escaped.push(c),
    }
  }
  escaped
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
  async fn save(
    &self,
    contract_id: &str,
    metadata: &ExecutionMetadata,
  ) -> Result<FlowSnapshot, StoreError> {
    if contract_id.is_empty() {
      return Err(StoreError::MissingContractId);
    }

    let snapshot = FlowSnapshot::capture(metadata, Utc::now());
    let path = self.snapshot_path(contract_id);

    fs::create_dir_all(&self.root).await?;

    // Replace the snapshot atomically
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, snapshot.encode()?).await?;
    fs::rename(&tmp_path, &path).await?;

    debug!(contract_id, path = %path.display(), "saved flow snapshot");
    Ok(snapshot)
  }

  async fn load(&self, contract_id: &str) -> Result<Option<FlowSnapshot>, StoreError> {
    if contract_id.is_empty() {
      return Ok(None);
    }

    let path = self.snapshot_path(contract_id);
    let raw = match fs::read_to_string(&path).await {
      Ok(raw) => raw,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };

    FlowSnapshot::decode(&raw).map(Some)
  }

  async fn delete(&self, contract_id: &str) -> Result<(), StoreError> {
    match fs::remove_file(self.snapshot_path(contract_id)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use msfsm_flow::GlobalStatus;

  #[test]
  fn test_snapshot_path_escapes_separators() {
    let store = FsSnapshotStore::new("/data/snapshots");
    assert_eq!(
      store.snapshot_path("acme/lease"),
      PathBuf::from("/data/snapshots/flow_execution_acme%2Flease.json")
    );
    assert_eq!(
      store.snapshot_path("a\\b%c"),
      PathBuf::from("/data/snapshots/flow_execution_a%5Cb%25c.json")
    );
  }

  #[test]
  fn test_distinct_ids_never_share_a_file() {
    let store = FsSnapshotStore::new("/data/snapshots");
    let ids = ["a/b", "a--b", "a%2Fb", "a\\b", "a%5Cb"];

    for (i, left) in ids.iter().enumerate() {
      for right in &ids[i + 1..] {
        assert_ne!(store.snapshot_path(left), store.snapshot_path(right), "{left} vs {right}");
      }
    }
  }

  #[tokio::test]
  async fn test_similar_ids_keep_separate_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSnapshotStore::new(dir.path());
    let metadata = |completed: &str| ExecutionMetadata {
      completed_automates: vec![completed.to_string()],
      contract_id: None,
      global_status: GlobalStatus::InProgress,
    };

    store.save("a/b", &metadata("01")).await.unwrap();
    store.save("a--b", &metadata("02")).await.unwrap();

    assert_eq!(
      store.load("a/b").await.unwrap().unwrap().completed_automates,
      vec!["01"]
    );
    assert_eq!(
      store.load("a--b").await.unwrap().unwrap().completed_automates,
      vec!["02"]
    );
  }

  #[tokio::test]
  async fn test_fs_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSnapshotStore::new(dir.path().join("snapshots"));
    let metadata = ExecutionMetadata {
      completed_automates: vec!["01".to_string(), "02".to_string()],
      contract_id: Some("sale".to_string()),
      global_status: GlobalStatus::Completed,
    };

    assert_eq!(store.load("sale").await.unwrap(), None);

    let saved = store.save("sale", &metadata).await.unwrap();
    let loaded = store.load("sale").await.unwrap().unwrap();
    assert!(loaded.same_state(&saved));
    assert_eq!(loaded.completed_automates, metadata.completed_automates);

    store.delete("sale").await.unwrap();
    store.delete("sale").await.unwrap();
    assert_eq!(store.load("sale").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_fs_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSnapshotStore::new(dir.path());
    std::fs::write(store.snapshot_path("sale"), "not json").unwrap();

    assert!(matches!(store.load("sale").await, Err(StoreError::Parse(_))));
  }
}
