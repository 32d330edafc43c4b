//! Turning captured records into write intents.

use std::sync::atomic::{AtomicU64, Ordering};

use pipeline_core::extract::{condition_columns, extract_primary_columns, extract_updated_columns};
use pipeline_core::{DataRecord, OperationKind, Position, Record};
use tracing::warn;

use crate::intent::{IntentKind, WriteIntent};
use crate::sharding::ShardingColumns;

/// Builds one write intent per data record.
///
/// The planner holds no per-record state, so batches can be planned in
/// parallel from a shared reference. The only shared value is the counter of
/// unique-key fallbacks.
#[derive(Debug, Default)]
pub struct ApplyPlanner {
    sharding: ShardingColumns,
    key_fallbacks: AtomicU64,
}

impl ApplyPlanner {
    pub fn new(sharding: ShardingColumns) -> Self {
        Self {
            sharding,
            key_fallbacks: AtomicU64::new(0),
        }
    }

    pub fn sharding_columns(&self) -> &ShardingColumns {
        &self.sharding
    }

    /// Number of records planned without a unique key so far.
    pub fn key_fallback_count(&self) -> u64 {
        self.key_fallbacks.load(Ordering::Relaxed)
    }

    /// Plan a whole batch, preserving arrival order.
    ///
    /// Placeholder records produce no intent. The first invalid record fails
    /// the entire batch so nothing from it is partially applied.
    pub fn plan_batch<P: Position>(
        &self,
        records: &[Record<P>],
    ) -> pipeline_core::Result<Vec<WriteIntent>> {
        records
            .iter()
            .filter_map(Record::as_data)
            .map(|record| self.plan_record(record))
            .collect()
    }

    /// Plan a single data record.
    pub fn plan_record<P: Position>(
        &self,
        record: &DataRecord<P>,
    ) -> pipeline_core::Result<WriteIntent> {
        record.validate()?;

        let intent = match record.kind() {
            OperationKind::Insert => {
                let primary = extract_primary_columns(record);
                let key_fallback = primary.is_empty();
                let condition = if key_fallback {
                    record.columns().to_vec()
                } else {
                    primary
                };
                WriteIntent {
                    table: record.table().to_string(),
                    kind: IntentKind::Create,
                    condition,
                    values: record.columns().to_vec(),
                    key_fallback,
                }
            }
            OperationKind::Update => {
                let condition = condition_columns(record, self.sharding.for_table(record.table()));
                WriteIntent {
                    table: record.table().to_string(),
                    kind: IntentKind::Mutate,
                    condition: condition.columns,
                    values: extract_updated_columns(record),
                    key_fallback: condition.key_fallback,
                }
            }
            OperationKind::Delete => {
                let condition = condition_columns(record, self.sharding.for_table(record.table()));
                WriteIntent {
                    table: record.table().to_string(),
                    kind: IntentKind::Remove,
                    condition: condition.columns,
                    values: Vec::new(),
                    key_fallback: condition.key_fallback,
                }
            }
        };

        if intent.key_fallback {
            self.key_fallbacks.fetch_add(1, Ordering::Relaxed);
            warn!(
                table = %intent.table,
                position = ?record.position(),
                "No unique key on {} record, matching on all {} columns",
                record.kind(),
                intent.condition.len()
            );
        }

        Ok(intent)
    }
}
