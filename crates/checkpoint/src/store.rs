//! Checkpoint storage trait and types
//!
//! This module defines the CheckpointStore trait for backend-agnostic
//! checkpoint storage operations, plus shared types.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Checkpoint, TaskKind};

/// Checkpoint identifier for storage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointID {
    /// Migration job the checkpoint belongs to
    pub job_id: String,
    /// Source type (e.g., "postgresql-wal", "mysql-binlog")
    pub database_type: String,
    /// Inventory or incremental task
    pub task: TaskKind,
}

impl CheckpointID {
    pub fn new(
        job_id: impl Into<String>,
        database_type: impl Into<String>,
        task: TaskKind,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            database_type: database_type.into(),
            task,
        }
    }
}

/// Checkpoint data stored in backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCheckpoint {
    /// Serialized checkpoint (e.g., LSN for PostgreSQL, binlog coordinates for MySQL)
    pub checkpoint_data: String,
    /// Database type for validation
    pub database_type: String,
    /// Task for validation
    pub task: TaskKind,
    /// Timestamp when checkpoint was created
    pub created_at: DateTime<Utc>,
}

impl StoredCheckpoint {
    /// Parse the stored data into a source-specific checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The `database_type` doesn't match `C::DATABASE_TYPE`
    /// - The checkpoint data can't be deserialized into type `C`
    pub fn parse<C: Checkpoint>(&self) -> Result<C> {
        if self.database_type != C::DATABASE_TYPE {
            anyhow::bail!(
                "Checkpoint type mismatch: expected '{}', found '{}'",
                C::DATABASE_TYPE,
                self.database_type
            );
        }
        Ok(serde_json::from_str(&self.checkpoint_data)?)
    }
}

/// Trait for checkpoint storage operations.
///
/// This trait abstracts the storage backend for checkpoint operations,
/// allowing the same checkpoint logic to work with:
/// - Filesystem storage (`FilesystemStore`)
/// - In-memory storage (`MemoryStore`)
/// - Disabled storage (`NullStore`)
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Store a checkpoint, replacing any previous one with the same id.
    async fn store_checkpoint(&self, id: &CheckpointID, checkpoint_data: String) -> Result<()>;

    /// Read a checkpoint from the storage backend.
    ///
    /// Returns None if the checkpoint doesn't exist.
    async fn read_checkpoint(&self, id: &CheckpointID) -> Result<Option<StoredCheckpoint>>;
}
