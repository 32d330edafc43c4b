//! Checkpoint management for reshard-sync
//!
//! Persists the position a migration job has reliably applied up to, so a
//! restarted job resumes from there instead of from the beginning.
//!
//! # Architecture
//!
//! This crate provides a generic checkpoint system that:
//! - Defines the `Checkpoint` trait for source-specific position tokens
//! - Supports multiple storage backends via the `CheckpointStore` trait
//! - Loads and saves positions through `CheckpointCoordinator`, retrying
//!   failed saves with exponential backoff
//!
//! ## Storage Backends
//!
//! - `FilesystemStore` - One JSON file per job and task
//! - `MemoryStore` - In-process map, for tests and dry runs
//! - `NullStore` - Discards every checkpoint (storage disabled)
//!
//! Each capture source (PostgreSQL WAL, MySQL binlog) implements its own
//! position token with the `Checkpoint` trait.

mod config;
mod coordinator;
mod error;
mod filesystem;
mod memory;
pub mod store;
mod task;

#[cfg(test)]
mod tests;

pub use config::{CheckpointConfig, CheckpointStorage, RetryPolicy};
pub use coordinator::CheckpointCoordinator;
pub use error::CheckpointIoError;
pub use filesystem::FilesystemStore;
pub use memory::{MemoryStore, NullStore};
pub use store::{CheckpointID, CheckpointStore, StoredCheckpoint};
pub use task::TaskKind;

/// Trait that source-specific position tokens must implement to be persisted.
///
/// # Example
///
/// ```rust
/// use checkpoint::Checkpoint;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct SequenceCheckpoint {
///     pub sequence_id: i64,
/// }
///
/// impl Checkpoint for SequenceCheckpoint {
///     const DATABASE_TYPE: &'static str = "sequence";
///
///     fn to_cli_string(&self) -> String {
///         self.sequence_id.to_string()
///     }
///
///     fn from_cli_string(s: &str) -> anyhow::Result<Self> {
///         Ok(Self { sequence_id: s.parse()? })
///     }
/// }
/// ```
pub trait Checkpoint: serde::Serialize + for<'de> serde::Deserialize<'de> + Clone {
    /// Source type identifier (e.g., "postgresql-wal", "mysql-binlog").
    ///
    /// Stored alongside the checkpoint and validated when it is loaded back.
    const DATABASE_TYPE: &'static str;

    /// Convert to CLI-friendly string format.
    ///
    /// The returned string should be parseable by `from_cli_string()`.
    fn to_cli_string(&self) -> String;

    /// Parse from CLI string format.
    fn from_cli_string(s: &str) -> anyhow::Result<Self>
    where
        Self: Sized;
}
