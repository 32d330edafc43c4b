//! Column subsets derived from a data record.
//!
//! Every function here is pure, returns a freshly allocated `Vec`, and keeps
//! the capture order of the record's columns. Write construction downstream
//! relies on that order being deterministic.

use std::collections::HashSet;

use crate::column::Column;
use crate::record::DataRecord;

/// Condition columns together with whether the unique-key fallback was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionColumns {
    pub columns: Vec<Column>,
    /// True when the record had no unique-key column and every column is used
    pub key_fallback: bool,
}

/// Columns flagged as part of the target's unique key.
pub fn extract_primary_columns<P>(record: &DataRecord<P>) -> Vec<Column> {
    record
        .columns()
        .iter()
        .filter(|c| c.unique_key)
        .cloned()
        .collect()
}

/// Columns needed to pin down the target row: unique-key columns plus any
/// column named in `sharding_columns`.
///
/// Without a unique key the filtered set could match more than one row, so
/// every column of the record is returned instead.
pub fn extract_condition_columns<P>(
    record: &DataRecord<P>,
    sharding_columns: &HashSet<String>,
) -> Vec<Column> {
    condition_columns(record, sharding_columns).columns
}

/// Same as [`extract_condition_columns`], but reports the unique-key fallback.
pub fn condition_columns<P>(
    record: &DataRecord<P>,
    sharding_columns: &HashSet<String>,
) -> ConditionColumns {
    if !record.has_unique_key() {
        return ConditionColumns {
            columns: record.columns().to_vec(),
            key_fallback: true,
        };
    }

    let columns = record
        .columns()
        .iter()
        .filter(|c| c.unique_key || sharding_columns.contains(&c.name))
        .cloned()
        .collect();
    ConditionColumns {
        columns,
        key_fallback: false,
    }
}

/// Columns whose value changed in this event.
pub fn extract_updated_columns<P>(record: &DataRecord<P>) -> Vec<Column> {
    record
        .columns()
        .iter()
        .filter(|c| c.updated)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Lsn;
    use crate::record::OperationKind;

    fn record(kind: OperationKind, columns: Vec<Column>) -> DataRecord<Lsn> {
        DataRecord::new("t_order", kind, Lsn(5), columns)
    }

    fn names(columns: &[Column]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn sharding(columns: &[&str]) -> HashSet<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_extract_primary_columns_keeps_order() {
        let r = record(
            OperationKind::Insert,
            vec![
                Column::new("tenant_id", 3).unique_key(true),
                Column::new("status", "NEW"),
                Column::new("order_id", 10).unique_key(true),
            ],
        );
        assert_eq!(names(&extract_primary_columns(&r)), ["tenant_id", "order_id"]);
    }

    #[test]
    fn test_update_with_sharding_column() {
        let r = record(
            OperationKind::Update,
            vec![
                Column::new("id", 1).unique_key(true).updated(false),
                Column::new("region", "eu").old_value("us").updated(true),
            ],
        );
        let sharding = sharding(&["region"]);

        assert_eq!(names(&extract_condition_columns(&r, &sharding)), ["id", "region"]);
        assert_eq!(names(&extract_updated_columns(&r)), ["region"]);
    }

    #[test]
    fn test_condition_columns_no_duplicates_when_key_is_sharding_column() {
        let r = record(
            OperationKind::Delete,
            vec![
                Column::new("user_id", 7).unique_key(true),
                Column::new("note", "x"),
                Column::new("order_id", 9).unique_key(true),
            ],
        );
        let sharding = sharding(&["user_id", "missing"]);

        let result = condition_columns(&r, &sharding);
        assert!(!result.key_fallback);
        assert_eq!(names(&result.columns), ["user_id", "order_id"]);
    }

    #[test]
    fn test_condition_columns_fall_back_to_all_columns() {
        let r = record(
            OperationKind::Update,
            vec![
                Column::new("a", 1).updated(false),
                Column::new("b", 2),
                Column::new("c", 3).updated(false),
            ],
        );

        for sharding in [sharding(&[]), sharding(&["b"]), sharding(&["zzz"])] {
            let result = condition_columns(&r, &sharding);
            assert!(result.key_fallback);
            assert_eq!(result.columns, r.columns());
        }
    }

    #[test]
    fn test_extract_updated_columns_is_idempotent() {
        let r = record(
            OperationKind::Update,
            vec![
                Column::new("id", 1).unique_key(true).updated(false),
                Column::new("status", "PAID"),
                Column::new("amount", 10).updated(false),
                Column::new("paid_at", "2024-01-01"),
            ],
        );

        let first = extract_updated_columns(&r);
        let second = extract_updated_columns(&r);
        assert_eq!(first, second);
        assert_eq!(names(&first), ["status", "paid_at"]);
    }
}
