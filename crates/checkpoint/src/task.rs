//! Task kinds a migration job checkpoints separately.

use serde::{Deserialize, Serialize};

/// The part of a migration job a checkpoint belongs to.
///
/// A job first copies a snapshot of existing rows (inventory) and then
/// replays the change log captured since (incremental). Each keeps its own
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Full-snapshot copy of existing rows
    Inventory,
    /// Change-log replay
    Incremental,
}

impl TaskKind {
    /// Used in checkpoint file names and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Inventory => "inventory",
            TaskKind::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "inventory" => Ok(TaskKind::Inventory),
            "incremental" => Ok(TaskKind::Incremental),
            other => Err(anyhow::anyhow!("Unknown task kind: {other}")),
        }
    }
}
