//! Process-local checkpoint stores.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::store::{CheckpointID, CheckpointStore, StoredCheckpoint};

/// Keeps checkpoints in a map for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStore {
    checkpoints: RwLock<HashMap<CheckpointID, StoredCheckpoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.checkpoints.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.checkpoints.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn store_checkpoint(&self, id: &CheckpointID, checkpoint_data: String) -> Result<()> {
        let stored = StoredCheckpoint {
            checkpoint_data,
            database_type: id.database_type.clone(),
            task: id.task,
            created_at: Utc::now(),
        };
        self.checkpoints.write().await.insert(id.clone(), stored);
        Ok(())
    }

    async fn read_checkpoint(&self, id: &CheckpointID) -> Result<Option<StoredCheckpoint>> {
        Ok(self.checkpoints.read().await.get(id).cloned())
    }
}

/// Store used when checkpointing is disabled: saves are dropped and nothing
/// is ever found.
pub struct NullStore;

#[async_trait]
impl CheckpointStore for NullStore {
    async fn store_checkpoint(&self, id: &CheckpointID, _checkpoint_data: String) -> Result<()> {
        tracing::trace!(job_id = %id.job_id, "Checkpoint storage disabled, dropping checkpoint");
        Ok(())
    }

    async fn read_checkpoint(&self, _id: &CheckpointID) -> Result<Option<StoredCheckpoint>> {
        Ok(None)
    }
}
