//! Uniform record model for captured changes.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::error::{Error, Result};
use crate::position::{Position, StreamPosition};

/// Row-level operation of a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "INSERT",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" | "I" => Ok(OperationKind::Insert),
            "UPDATE" | "U" => Ok(OperationKind::Update),
            "DELETE" | "D" => Ok(OperationKind::Delete),
            _ => Err(Error::UnsupportedOperationKind(s.to_string())),
        }
    }
}

/// Why a placeholder record was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderReason {
    Heartbeat,
    Ddl,
    LowWaterMark,
}

/// A captured row change.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord<P> {
    table: String,
    kind: OperationKind,
    position: P,
    columns: Vec<Column>,
}

impl<P> DataRecord<P> {
    pub fn new(
        table: impl Into<String>,
        kind: OperationKind,
        position: P,
        columns: Vec<Column>,
    ) -> Self {
        Self {
            table: table.into(),
            kind,
            position,
            columns,
        }
    }

    /// Logical table name
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn position(&self) -> &P {
        &self.position
    }

    /// Columns in capture order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_unique_key(&self) -> bool {
        self.columns.iter().any(|c| c.unique_key)
    }

    /// Check that the record can be replayed.
    ///
    /// A record needs at least one column and unique column names. An update
    /// must flag at least one updated column, otherwise there is nothing to
    /// SET on the target.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::malformed(
                &self.table,
                format!("{} record has no columns", self.kind),
            ));
        }

        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::malformed(
                    &self.table,
                    format!("duplicate column '{}'", column.name),
                ));
            }
        }

        if self.kind == OperationKind::Update && !self.columns.iter().any(|c| c.updated) {
            return Err(Error::malformed(&self.table, "update record has no updated columns"));
        }

        Ok(())
    }
}

/// A stream marker that carries a position but no row data.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderRecord<P> {
    position: P,
    reason: Option<PlaceholderReason>,
}

impl<P> PlaceholderRecord<P> {
    pub fn new(position: P, reason: Option<PlaceholderReason>) -> Self {
        Self { position, reason }
    }

    pub fn position(&self) -> &P {
        &self.position
    }

    pub fn reason(&self) -> Option<PlaceholderReason> {
        self.reason
    }
}

/// A record from the capture stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Record<P> {
    Data(DataRecord<P>),
    Placeholder(PlaceholderRecord<P>),
}

impl<P> Record<P> {
    pub fn position(&self) -> &P {
        match self {
            Record::Data(data) => data.position(),
            Record::Placeholder(placeholder) => placeholder.position(),
        }
    }

    pub fn as_data(&self) -> Option<&DataRecord<P>> {
        match self {
            Record::Data(data) => Some(data),
            Record::Placeholder(_) => None,
        }
    }
}

impl<P> From<DataRecord<P>> for Record<P> {
    fn from(record: DataRecord<P>) -> Self {
        Record::Data(record)
    }
}

impl<P> From<PlaceholderRecord<P>> for Record<P> {
    fn from(record: PlaceholderRecord<P>) -> Self {
        Record::Placeholder(record)
    }
}

impl<T> Record<StreamPosition<T>>
where
    T: Position + FromStr<Err = Error>,
{
    /// Build a record from a deserialized capture event.
    ///
    /// A missing position, or the literal `placeholder`, becomes
    /// [`StreamPosition::Placeholder`].
    pub fn try_from_raw(raw: RawRecord) -> Result<Self> {
        let parse_position = |position: Option<String>| match position {
            Some(text) => text.parse::<StreamPosition<T>>(),
            None => Ok(StreamPosition::Placeholder),
        };

        match raw {
            RawRecord::Data {
                table,
                op,
                position,
                columns,
            } => {
                let kind = op.parse::<OperationKind>()?;
                let position = parse_position(position)?;
                Ok(Record::Data(DataRecord::new(table, kind, position, columns)))
            }
            RawRecord::Placeholder { position, reason } => {
                let position = parse_position(position)?;
                Ok(Record::Placeholder(PlaceholderRecord::new(position, reason)))
            }
        }
    }
}

/// A captured event as it arrives from an already-deserialized stream.
///
/// ```json
/// {"type": "data", "table": "t_order", "op": "UPDATE", "position": "0/16B3748",
///  "columns": [{"name": "id", "value": 1, "unique_key": true}]}
/// {"type": "placeholder", "reason": "heartbeat"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRecord {
    Data {
        table: String,
        op: String,
        #[serde(default)]
        position: Option<String>,
        columns: Vec<Column>,
    },
    Placeholder {
        #[serde(default)]
        position: Option<String>,
        #[serde(default)]
        reason: Option<PlaceholderReason>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Lsn;

    fn update(columns: Vec<Column>) -> DataRecord<Lsn> {
        DataRecord::new("t_order", OperationKind::Update, Lsn(1), columns)
    }

    #[test]
    fn test_operation_kind_from_str() {
        assert_eq!("insert".parse::<OperationKind>().unwrap(), OperationKind::Insert);
        assert_eq!("U".parse::<OperationKind>().unwrap(), OperationKind::Update);
        assert_eq!("DELETE".parse::<OperationKind>().unwrap(), OperationKind::Delete);
        assert_eq!(
            "TRUNCATE".parse::<OperationKind>().unwrap_err(),
            Error::UnsupportedOperationKind("TRUNCATE".to_string())
        );
    }

    #[test]
    fn test_validate_update_without_updated_columns() {
        let record = update(vec![Column::new("id", 1).unique_key(true).updated(false)]);
        let err = record.validate().unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
        assert!(err.to_string().contains("no updated columns"));
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicate_columns() {
        assert!(update(vec![]).validate().is_err());

        let record = update(vec![Column::new("id", 1), Column::new("id", 2)]);
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate column 'id'"));
    }

    #[test]
    fn test_validate_accepts_well_formed_update() {
        let record = update(vec![
            Column::new("id", 1).unique_key(true).updated(false),
            Column::new("status", "PAID"),
        ]);
        assert!(record.validate().is_ok());
        assert!(record.has_unique_key());
    }

    #[test]
    fn test_try_from_raw() {
        let line = r#"{"type":"data","table":"t_order","op":"UPDATE","position":"0/16B3748",
            "columns":[{"name":"id","value":1,"unique_key":true},{"name":"status","value":"PAID","updated":true}]}"#;
        let raw: RawRecord = serde_json::from_str(line).unwrap();
        let record = Record::<StreamPosition<Lsn>>::try_from_raw(raw).unwrap();

        assert_eq!(record.position(), &StreamPosition::At(Lsn(0x16B3748)));
        let data = record.as_data().unwrap();
        assert_eq!(data.table(), "t_order");
        assert_eq!(data.kind(), OperationKind::Update);
        assert_eq!(data.columns().len(), 2);

        let raw: RawRecord =
            serde_json::from_str(r#"{"type":"placeholder","reason":"heartbeat"}"#).unwrap();
        let record = Record::<StreamPosition<Lsn>>::try_from_raw(raw).unwrap();
        assert_eq!(record.position(), &StreamPosition::Placeholder);
        assert!(record.as_data().is_none());
    }

    #[test]
    fn test_try_from_raw_unsupported_op() {
        let raw = RawRecord::Data {
            table: "t_order".to_string(),
            op: "TRUNCATE".to_string(),
            position: Some("0/1".to_string()),
            columns: vec![],
        };
        let err = Record::<StreamPosition<Lsn>>::try_from_raw(raw).unwrap_err();
        assert_eq!(err, Error::UnsupportedOperationKind("TRUNCATE".to_string()));
    }
}
