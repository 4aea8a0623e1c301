//! Msfsm Store
//!
//! This crate persists execution snapshots of deployment flows: the set of
//! completed automata and the global status, stamped with the time of the
//! last refresh. Snapshots are keyed by the deployed contract's id and are
//! independent of the flow graph they were taken from. Checking that a loaded
//! snapshot still matches the current graph is left to the caller.
//!
//! The [`SnapshotStore`] trait defines operations for:
//! - Saving the snapshot of a flow's execution metadata
//! - Loading the last saved snapshot
//! - Removing a snapshot

mod fs;
mod memory;
mod snapshot;

pub use fs::FsSnapshotStore;
pub use memory::InMemorySnapshotStore;
pub use snapshot::{FlowSnapshot, STORAGE_KEY_PREFIX, storage_key};

use async_trait::async_trait;
use msfsm_flow::ExecutionMetadata;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// A snapshot can only be saved under a contract id.
  #[error("contract id is not set")]
  MissingContractId,

  /// A stored snapshot could not be parsed or a snapshot could not be encoded.
  #[error("malformed snapshot: {0}")]
  Parse(#[from] serde_json::Error),

  /// Reading or writing the backing storage failed.
  #[error("storage i/o error: {0}")]
  Io(#[from] std::io::Error),
}

/// Storage trait for flow execution snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
  /// Save the execution metadata of a flow under `contract_id`, stamped now.
  async fn save(
    &self,
    contract_id: &str,
    metadata: &ExecutionMetadata,
  ) -> Result<FlowSnapshot, StoreError>;

  /// Load the last snapshot saved under `contract_id`.
  ///
  /// Returns `None` when nothing was saved or `contract_id` is empty.
  async fn load(&self, contract_id: &str) -> Result<Option<FlowSnapshot>, StoreError>;

  /// Remove the snapshot saved under `contract_id`, if any.
  async fn delete(&self, contract_id: &str) -> Result<(), StoreError>;
}

/// Save a flow's metadata under its own contract id.
///
/// Flows that were never deployed carry no contract id; nothing is written
/// for them and `None` is returned.
pub async fn save_metadata<S>(
  store: &S,
  metadata: &ExecutionMetadata,
) -> Result<Option<FlowSnapshot>, StoreError>
where
  S: SnapshotStore + ?Sized,
{
  match metadata.contract_id.as_deref() {
    Some(contract_id) if !contract_id.is_empty() => {
      store.save(contract_id, metadata).await.map(Some)
    }
    _ => Ok(None),
  }
}

/// Load the snapshot for an optional contract id.
pub async fn load_for<S>(
  store: &S,
  contract_id: Option<&str>,
) -> Result<Option<FlowSnapshot>, StoreError>
where
  S: SnapshotStore + ?Sized,
{
  match contract_id {
    Some(contract_id) => store.load(contract_id).await,
    None => Ok(None),
  }
}
