//! Transaction type selection.
//!
//! The transaction manager itself lives outside this crate. Executors receive
//! the configured type and must apply a whole batch under one transaction of
//! that kind.

use serde::{Deserialize, Serialize};

/// Distributed transaction type wrapping each applied batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Single-datasource local transaction
    #[default]
    Local,
    /// Two-phase commit across data sources
    Xa,
    /// Saga-style compensating transaction
    Base,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "LOCAL"),
            Self::Xa => write!(f, "XA"),
            Self::Base => write!(f, "BASE"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOCAL" => Ok(Self::Local),
            "XA" => Ok(Self::Xa),
            "BASE" => Ok(Self::Base),
            _ => Err(anyhow::anyhow!(
                "Invalid transaction type: '{s}'. Expected 'LOCAL', 'XA' or 'BASE'"
            )),
        }
    }
}
