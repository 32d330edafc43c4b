//! Source stream positions.
//!
//! A position is an opaque token marking where in the capture stream a record
//! came from. The pipeline only ever needs two things from it: whether it is a
//! placeholder, and how it orders against other positions of the same source.
//! Each capture source plugs in its own token type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Position of a record within a capture stream.
///
/// Positions are totally ordered and non-decreasing in arrival order for a
/// given source partition.
pub trait Position: Clone + Ord + fmt::Debug + Send + Sync + 'static {
    /// Returns true for markers that advance the stream without carrying a
    /// position worth checkpointing.
    fn is_placeholder(&self) -> bool;
}

/// A source token, or a placeholder marker interleaved with real tokens.
///
/// Placeholders sort before every concrete token. They are never
/// checkpointed, so the ordering only matters for keeping the trait total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamPosition<T> {
    /// Heartbeat, DDL skip marker or low-water-mark
    Placeholder,
    /// A concrete source position
    At(T),
}

impl<T> StreamPosition<T> {
    /// The concrete token, if this is not a placeholder.
    pub fn token(&self) -> Option<&T> {
        match self {
            Self::Placeholder => None,
            Self::At(token) => Some(token),
        }
    }

    pub fn into_token(self) -> Option<T> {
        match self {
            Self::Placeholder => None,
            Self::At(token) => Some(token),
        }
    }
}

impl<T: Position> Position for StreamPosition<T> {
    fn is_placeholder(&self) -> bool {
        match self {
            Self::Placeholder => true,
            Self::At(token) => token.is_placeholder(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for StreamPosition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placeholder => f.write_str("placeholder"),
            Self::At(token) => token.fmt(f),
        }
    }
}

impl<T: FromStr<Err = Error>> FromStr for StreamPosition<T> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "placeholder" => Ok(Self::Placeholder),
            other => other.parse().map(Self::At),
        }
    }
}

/// PostgreSQL WAL log sequence number.
///
/// The text form is the server's `X/Y` notation: the upper and lower 32 bits
/// in hexadecimal (e.g. `0/1949850`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lsn(pub u64);

impl Position for Lsn {
    fn is_placeholder(&self) -> bool {
        false
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.0 >> 32, self.0 & 0xFFFF_FFFF)
    }
}

impl FromStr for Lsn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::InvalidPosition {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let (high, low) = s
            .split_once('/')
            .ok_or_else(|| invalid("expected LSN format like '0/1949850'"))?;
        let high = u32::from_str_radix(high, 16).map_err(|e| invalid(&e.to_string()))?;
        let low = u32::from_str_radix(low, 16).map_err(|e| invalid(&e.to_string()))?;
        Ok(Lsn((u64::from(high) << 32) | u64::from(low)))
    }
}

impl TryFrom<String> for Lsn {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lsn> for String {
    fn from(lsn: Lsn) -> Self {
        lsn.to_string()
    }
}

impl checkpoint::Checkpoint for Lsn {
    const DATABASE_TYPE: &'static str = "postgresql-wal";

    fn to_cli_string(&self) -> String {
        self.to_string()
    }

    fn from_cli_string(s: &str) -> anyhow::Result<Self> {
        Ok(s.parse()?)
    }
}

/// MySQL binlog coordinates.
///
/// Binlog file names carry a fixed-width sequence suffix, so ordering by file
/// name and then offset follows the server's write order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BinlogPosition {
    /// Binlog file name (e.g. `mysql-bin.000003`)
    pub filename: String,
    /// Offset of the next event within the file
    pub offset: u64,
}

impl BinlogPosition {
    pub fn new(filename: impl Into<String>, offset: u64) -> Self {
        Self {
            filename: filename.into(),
            offset,
        }
    }
}

impl Position for BinlogPosition {
    fn is_placeholder(&self) -> bool {
        false
    }
}

impl fmt::Display for BinlogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.offset)
    }
}

impl FromStr for BinlogPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| Error::InvalidPosition {
            value: s.to_string(),
            reason,
        };
        let (filename, offset) = s
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected binlog format like 'mysql-bin.000003:4'".into()))?;
        if filename.is_empty() {
            return Err(invalid("empty binlog file name".into()));
        }
        let offset = offset.parse().map_err(|e| invalid(format!("{e}")))?;
        Ok(Self::new(filename, offset))
    }
}

impl checkpoint::Checkpoint for BinlogPosition {
    const DATABASE_TYPE: &'static str = "mysql-binlog";

    fn to_cli_string(&self) -> String {
        self.to_string()
    }

    fn from_cli_string(s: &str) -> anyhow::Result<Self> {
        Ok(s.parse()?)
    }
}
