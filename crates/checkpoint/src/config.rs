//! Checkpoint storage and retry configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::{CheckpointStore, FilesystemStore, MemoryStore, NullStore};

/// Where checkpoints are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointStorage {
    /// Checkpoints are discarded; a restarted job starts from the beginning
    Disabled,

    /// One JSON file per job and task in `dir`
    Filesystem { dir: String },

    /// Process-local map, lost on exit
    Memory,
}

impl CheckpointStorage {
    /// Build the store backing this storage choice.
    pub fn build(&self) -> Arc<dyn CheckpointStore> {
        match self {
            CheckpointStorage::Disabled => Arc::new(NullStore),
            CheckpointStorage::Filesystem { dir } => Arc::new(FilesystemStore::new(dir)),
            CheckpointStorage::Memory => Arc::new(MemoryStore::new()),
        }
    }
}

/// Retry schedule for checkpoint saves.
///
/// The delay doubles after every failed attempt, capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never sleeps.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1 for the first retry).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Configuration for checkpoint operations.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    pub storage: CheckpointStorage,
    pub retry: RetryPolicy,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            storage: CheckpointStorage::Filesystem {
                dir: ".reshard-sync-checkpoints".to_string(),
            },
            retry: RetryPolicy::default(),
        }
    }
}

impl CheckpointConfig {
    /// Create a config that writes checkpoint files to `dir`.
    pub fn filesystem(dir: impl Into<String>) -> Self {
        Self {
            storage: CheckpointStorage::Filesystem { dir: dir.into() },
            ..Self::default()
        }
    }

    /// Create a config with checkpoint storage disabled.
    pub fn disabled() -> Self {
        Self {
            storage: CheckpointStorage::Disabled,
            ..Self::default()
        }
    }

    /// Check if checkpoints are persisted anywhere.
    pub fn is_enabled(&self) -> bool {
        self.storage != CheckpointStorage::Disabled
    }
}
