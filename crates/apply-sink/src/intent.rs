//! Write intents handed to the executor.

use pipeline_core::Column;
use serde::{Deserialize, Serialize};

/// Row-level write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Create a row from all captured columns
    Create,
    /// Update the row matched by `condition` with `values`
    Mutate,
    /// Remove the row matched by `condition`
    Remove,
}

/// One write derived from one data record.
///
/// `condition` always carries full key material (plus sharding columns for
/// mutate and remove) so replaying an intent twice converges on the same
/// target state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteIntent {
    /// Logical target table
    pub table: String,
    pub kind: IntentKind,
    /// Columns matching the target row, compared on their condition values
    pub condition: Vec<Column>,
    /// Columns to write: every column for create, updated columns for mutate,
    /// empty for remove
    pub values: Vec<Column>,
    /// No unique key was flagged, so `condition` holds every column
    #[serde(default)]
    pub key_fallback: bool,
}
