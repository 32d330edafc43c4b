//! In-memory target used for dry runs and replay verification.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use anyhow::Result;
use pipeline_core::Column;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::executor::WriteExecutor;
use crate::intent::{IntentKind, WriteIntent};
use crate::transaction::TransactionType;

/// A target row, keyed by column name.
pub type Row = BTreeMap<String, Value>;

/// Applies intents to in-memory tables.
///
/// Each batch is staged on a copy of the tables and swapped in only when every
/// intent applied, which gives the same all-or-nothing behavior a real
/// transaction would.
#[derive(Default)]
pub struct InMemoryTarget {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    fail_batches: AtomicU32,
    committed: AtomicU64,
}

fn matches(row: &Row, condition: &[Column]) -> bool {
    condition
        .iter()
        .all(|c| row.get(&c.name) == Some(c.condition_value()))
}

fn apply_intent(tables: &mut HashMap<String, Vec<Row>>, intent: &WriteIntent) {
    let rows = tables.entry(intent.table.clone()).or_default();
    match intent.kind {
        IntentKind::Create => {
            let row: Row = intent
                .values
                .iter()
                .map(|c| (c.name.clone(), c.value.clone()))
                .collect();
            match rows.iter_mut().find(|r| matches(r, &intent.condition)) {
                Some(existing) => *existing = row,
                None => rows.push(row),
            }
        }
        IntentKind::Mutate => {
            let mut touched = 0;
            for row in rows.iter_mut().filter(|r| matches(r, &intent.condition)) {
                for column in &intent.values {
                    row.insert(column.name.clone(), column.value.clone());
                }
                touched += 1;
            }
            if touched == 0 {
                debug!(table = %intent.table, "Mutate matched no row");
            }
        }
        IntentKind::Remove => {
            rows.retain(|r| !matches(r, &intent.condition));
        }
    }
}

impl InMemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` batches fail without applying anything.
    pub fn fail_next_batches(&self, count: u32) {
        self.fail_batches.store(count, Ordering::SeqCst);
    }

    /// Number of batches committed so far.
    pub fn committed_batches(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    /// Names of every table touched so far, sorted.
    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Current rows of `table`, in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl WriteExecutor for InMemoryTarget {
    async fn execute_batch(
        &self,
        transaction: TransactionType,
        intents: &[WriteIntent],
    ) -> Result<()> {
        if self
            .fail_batches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("{transaction} transaction rolled back: injected failure");
        }

        let mut tables = self.tables.lock().await;
        let mut staged = tables.clone();
        for intent in intents {
            apply_intent(&mut staged, intent);
        }
        *tables = staged;
        self.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(id: i64, region: &str) -> WriteIntent {
        WriteIntent {
            table: "t_order".to_string(),
            kind: IntentKind::Create,
            condition: vec![Column::new("id", id).unique_key(true)],
            values: vec![Column::new("id", id).unique_key(true), Column::new("region", region)],
            key_fallback: false,
        }
    }

    fn move_region(id: i64, from: &str, to: &str) -> WriteIntent {
        WriteIntent {
            table: "t_order".to_string(),
            kind: IntentKind::Mutate,
            condition: vec![
                Column::new("id", id).unique_key(true).updated(false),
                Column::new("region", to).old_value(from),
            ],
            values: vec![Column::new("region", to).old_value(from)],
            key_fallback: false,
        }
    }

    #[tokio::test]
    async fn test_replaying_a_batch_converges() {
        let target = InMemoryTarget::new();
        let batch = vec![create(1, "us"), move_region(1, "us", "eu"), create(2, "us")];

        target.execute_batch(TransactionType::Local, &batch).await.unwrap();
        let first = target.rows("t_order").await;
        target.execute_batch(TransactionType::Local, &batch).await.unwrap();
        let second = target.rows("t_order").await;

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(target.table_names().await, ["t_order"]);
        assert_eq!(first[0]["region"], json!("eu"));
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let target = InMemoryTarget::new();
        target.fail_next_batches(1);

        let err = target
            .execute_batch(TransactionType::Xa, &[create(1, "us")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("XA transaction rolled back"));
        assert!(target.rows("t_order").await.is_empty());
        assert_eq!(target.committed_batches(), 0);

        target
            .execute_batch(TransactionType::Xa, &[create(1, "us")])
            .await
            .unwrap();
        assert_eq!(target.rows("t_order").await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_matches_condition() {
        let target = InMemoryTarget::new();
        target
            .execute_batch(TransactionType::Base, &[create(1, "us"), create(2, "eu")])
            .await
            .unwrap();

        let remove = WriteIntent {
            table: "t_order".to_string(),
            kind: IntentKind::Remove,
            condition: vec![Column::new("id", 1).unique_key(true), Column::new("region", "us")],
            values: vec![],
            key_fallback: false,
        };
        target.execute_batch(TransactionType::Base, &[remove]).await.unwrap();

        let rows = target.rows("t_order").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(2));
    }
}
