//! Errors raised while normalizing and planning captured records.

use thiserror::Error;

/// Error type for record normalization, extraction and planning.
///
/// Both variants abort the batch that contained the offending record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A data record lacks the structure needed to replay it.
    #[error("Malformed record for table '{table}': {reason}")]
    MalformedRecord { table: String, reason: String },

    /// The capture source produced an operation kind that has no write intent.
    #[error("Unsupported operation kind: {0}")]
    UnsupportedOperationKind(String),

    /// A position token could not be parsed from its text form.
    #[error("Invalid position '{value}': {reason}")]
    InvalidPosition { value: String, reason: String },
}

impl Error {
    pub(crate) fn malformed(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            table: table.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
