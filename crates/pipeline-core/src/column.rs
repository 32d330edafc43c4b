//! Column values carried by a data record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single column of a captured row.
///
/// `updated` is only meaningful for update records; capture sources flag every
/// present column as updated for inserts and deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within a record
    pub name: String,

    /// New value (the row image after the change)
    #[serde(default)]
    pub value: Value,

    /// Previous value, present for updates that captured a before image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,

    /// Whether the value changed in this event
    #[serde(default)]
    pub updated: bool,

    /// Whether the column is part of the target's primary or unique key
    #[serde(default)]
    pub unique_key: bool,
}

impl Column {
    /// Create a column flagged as updated and not part of any key.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            old_value: None,
            updated: true,
            unique_key: false,
        }
    }

    pub fn old_value(mut self, old_value: impl Into<Value>) -> Self {
        self.old_value = Some(old_value.into());
        self
    }

    pub fn updated(mut self, updated: bool) -> Self {
        self.updated = updated;
        self
    }

    pub fn unique_key(mut self, unique_key: bool) -> Self {
        self.unique_key = unique_key;
        self
    }

    /// Value used to match the existing target row.
    ///
    /// An update that rewrites a key or sharding column must be matched on
    /// its before image, so the old value wins when one was captured.
    pub fn condition_value(&self) -> &Value {
        self.old_value.as_ref().unwrap_or(&self.value)
    }
}
