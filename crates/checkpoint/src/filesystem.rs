//! Filesystem-based checkpoint storage implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;

use crate::store::{CheckpointID, CheckpointStore, StoredCheckpoint};

/// Filesystem implementation of CheckpointStore trait.
///
/// Stores one JSON file per job and task. Each save writes a temporary file
/// and renames it over the previous checkpoint, so a crash mid-write leaves
/// the last complete checkpoint in place.
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the directory path.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Path of the checkpoint file for `id`.
    pub fn path_for(&self, id: &CheckpointID) -> PathBuf {
        let job: String = id
            .job_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir
            .join(format!("checkpoint_{}_{}.json", job, id.task.as_str()))
    }
}

#[async_trait]
impl CheckpointStore for FilesystemStore {
    async fn store_checkpoint(&self, id: &CheckpointID, checkpoint_data: String) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let stored = StoredCheckpoint {
            checkpoint_data,
            database_type: id.database_type.clone(),
            task: id.task,
            created_at: Utc::now(),
        };

        let filename = self.path_for(id);
        let tmp = filename.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&stored)?)?;
        std::fs::rename(&tmp, &filename)?;

        tracing::debug!("Stored checkpoint to {}", filename.display());
        Ok(())
    }

    async fn read_checkpoint(&self, id: &CheckpointID) -> Result<Option<StoredCheckpoint>> {
        let filename = self.path_for(id);
        if !filename.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&filename)?;
        let stored: StoredCheckpoint = serde_json::from_str(&content)?;
        if stored.database_type != id.database_type {
            anyhow::bail!(
                "Checkpoint file {} belongs to '{}', expected '{}'",
                filename.display(),
                stored.database_type,
                id.database_type
            );
        }
        Ok(Some(stored))
    }
}
