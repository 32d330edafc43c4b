//! Executor that writes committed batches as JSON lines.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::executor::WriteExecutor;
use crate::intent::WriteIntent;
use crate::transaction::TransactionType;

#[derive(Serialize)]
struct BatchLine<'a> {
    batch: u64,
    transaction: TransactionType,
    intents: &'a [WriteIntent],
}

/// Writes each batch as a single JSON line, flushed before returning.
///
/// Used for dry runs and for piping intents into another process.
pub struct JsonLinesExecutor<W> {
    writer: Mutex<W>,
    batches: AtomicU64,
}

impl<W: Write + Send> JsonLinesExecutor<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            batches: AtomicU64::new(0),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesExecutor<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait::async_trait]
impl<W: Write + Send> WriteExecutor for JsonLinesExecutor<W> {
    async fn execute_batch(
        &self,
        transaction: TransactionType,
        intents: &[WriteIntent],
    ) -> Result<()> {
        // Batch numbers are assigned under the writer lock so concurrent
        // callers never share one.
        let mut writer = self.writer.lock().await;
        let batch = self.batches.load(Ordering::Relaxed) + 1;
        let line = serde_json::to_string(&BatchLine {
            batch,
            transaction,
            intents,
        })?;

        writeln!(writer, "{line}").context("Failed to write batch")?;
        writer.flush().context("Failed to flush batch")?;
        self.batches.store(batch, Ordering::Relaxed);
        Ok(())
    }
}
