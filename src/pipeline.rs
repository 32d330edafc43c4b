//! Staged replay pipeline for one migration job.
//!
//! ```text
//! capture ──(bounded queue)──► plan (blocking pool) ──► execute ──► checkpoint
//! ```
//!
//! Capture runs ahead of the target until the queue is full. Planned batches
//! are merged back in arrival order before execution, and a batch's position
//! is saved only after the executor committed it. On restart the job resumes
//! from the saved position, so delivery is at-least-once.

use std::sync::Arc;

use anyhow::{Context, Result};
use apply_sink::{ApplyPlanner, WriteExecutor, WriteIntent};
use checkpoint::{Checkpoint, CheckpointCoordinator, TaskKind};
use futures::StreamExt;
use pipeline_core::{Position, PositionTracker, Record, StreamPosition};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::source::CaptureSource;

type Batch<T> = Vec<Record<StreamPosition<T>>>;

/// A batch after planning, ready for execution.
struct PlannedBatch<T> {
    seq: u64,
    records: usize,
    intents: Vec<WriteIntent>,
    position: Option<StreamPosition<T>>,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub records: u64,
    pub batches: u64,
    pub intents: u64,
    pub key_fallbacks: u64,
    pub checkpoint_failures: u64,
    /// Last position saved to the checkpoint store, in CLI form
    pub last_checkpoint: Option<String>,
    /// The run ended because shutdown was requested
    pub interrupted: bool,
}

/// Replay pipeline for one migration job.
///
/// The pipeline owns the job's planner, executor and checkpoint coordinator.
/// Each job gets its own instance; nothing is shared through globals.
pub struct Pipeline {
    config: PipelineConfig,
    planner: Arc<ApplyPlanner>,
    executor: Arc<dyn WriteExecutor>,
    coordinator: CheckpointCoordinator,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, executor: Arc<dyn WriteExecutor>) -> Result<Self> {
        config.validate()?;
        let coordinator = CheckpointCoordinator::from_config(
            &config.checkpoint,
            &config.job_id,
            TaskKind::Incremental,
        );
        Ok(Self::with_coordinator(config, executor, coordinator))
    }

    /// Build a pipeline around an existing coordinator (e.g. one backed by a
    /// custom store).
    pub fn with_coordinator(
        config: PipelineConfig,
        executor: Arc<dyn WriteExecutor>,
        coordinator: CheckpointCoordinator,
    ) -> Self {
        let planner = Arc::new(ApplyPlanner::new(config.sharding.clone()));
        Self {
            config,
            planner,
            executor,
            coordinator,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn planner(&self) -> &ApplyPlanner {
        &self.planner
    }

    /// Run until the source is exhausted, a batch fails, or `shutdown` flips
    /// to true.
    ///
    /// Planning and execution errors abort the run; nothing after the last
    /// committed batch is checkpointed, so a retry resumes from there.
    /// Checkpoint save failures are logged and counted but do not stop the
    /// run.
    pub async fn run<T, S>(
        &self,
        mut source: S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<PipelineReport>
    where
        T: Position + Checkpoint,
        S: CaptureSource<T> + 'static,
    {
        let job_id = self.config.job_id.clone();
        let resume = self
            .coordinator
            .load_position::<T>()
            .await
            .with_context(|| format!("Failed to load checkpoint for job '{job_id}'"))?;
        match &resume {
            Some(position) => info!(%job_id, "Resuming from {}", position.to_cli_string()),
            None => info!(%job_id, "Starting from the beginning of the stream"),
        }

        source.resume_from(resume.clone());
        let mut tracker =
            PositionTracker::resume_from(job_id.clone(), resume.map(StreamPosition::At));

        let (batch_tx, batch_rx) = mpsc::channel(self.config.queue_capacity);
        let capture = spawn_capture(
            source,
            batch_tx,
            self.config.batch_size,
            self.config.flush_interval,
            shutdown.clone(),
        );

        let planner = self.planner.clone();
        let mut planned = ReceiverStream::new(batch_rx)
            .enumerate()
            .map(move |(seq, batch)| plan(planner.clone(), seq as u64 + 1, batch))
            .buffered(self.config.plan_concurrency);

        let mut report = PipelineReport::default();

        let outcome: Result<()> = async {
            loop {
                let batch = tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut shutdown) => {
                        info!(%job_id, "Shutdown requested, dropping uncommitted batches");
                        report.interrupted = true;
                        return Ok(());
                    }
                    batch = planned.next() => match batch {
                        Some(batch) => batch?,
                        None => return Ok(()),
                    },
                };

                if *shutdown.borrow() {
                    info!(%job_id, "Shutdown requested, dropping uncommitted batches");
                    report.interrupted = true;
                    return Ok(());
                }

                self.executor
                    .execute_batch(self.config.transaction_type, &batch.intents)
                    .await
                    .with_context(|| {
                        format!(
                            "Batch {} failed under {} transaction; resume from the last checkpoint",
                            batch.seq, self.config.transaction_type
                        )
                    })?;

                report.batches += 1;
                report.records += batch.records as u64;
                report.intents += batch.intents.len() as u64;
                report.key_fallbacks +=
                    batch.intents.iter().filter(|i| i.key_fallback).count() as u64;
                debug!(%job_id, seq = batch.seq, intents = batch.intents.len(), "Committed batch");

                let Some(position) = batch.position else {
                    debug!(
                        %job_id,
                        seq = batch.seq,
                        "Batch held only placeholders, nothing to checkpoint"
                    );
                    continue;
                };
                if !tracker.confirm(position.clone()) {
                    continue;
                }
                let Some(token) = position.token() else {
                    continue;
                };
                match self.coordinator.save_position(token).await {
                    Ok(()) => report.last_checkpoint = Some(token.to_cli_string()),
                    Err(e) => {
                        warn!(%job_id, "{e}. Committed writes may be re-delivered after a restart");
                        report.checkpoint_failures += 1;
                    }
                }
            }
        }
        .await;

        // Dropping the stream closes the queue; the capture task watches for
        // that and stops even while the source is idle.
        drop(planned);
        let capture_result = capture.await.context("Capture task panicked")?;

        if report.key_fallbacks > 0 {
            warn!(
                %job_id,
                "{} committed record(s) had no unique key and were matched on all columns",
                report.key_fallbacks
            );
        }

        if let Err(e) = outcome {
            error!(%job_id, "Pipeline stopped: {e:#}");
            return Err(e);
        }
        capture_result?;

        info!(
            %job_id,
            "Pipeline finished: {} records, {} batches, {} intents, last checkpoint {}",
            report.records,
            report.batches,
            report.intents,
            report.last_checkpoint.as_deref().unwrap_or("none")
        );
        Ok(report)
    }
}

/// Resolves once shutdown is requested. A dropped sender never requests it.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Plan one batch on the blocking pool.
async fn plan<T: Position>(
    planner: Arc<ApplyPlanner>,
    seq: u64,
    batch: Result<Batch<T>>,
) -> Result<PlannedBatch<T>> {
    let records = batch?;
    tokio::task::spawn_blocking(move || -> Result<PlannedBatch<T>> {
        let intents = planner
            .plan_batch(&records)
            .with_context(|| format!("Failed to plan batch {seq}"))?;
        let position =
            pipeline_core::get_last_normal_record(&records).map(|r| r.position().clone());
        Ok(PlannedBatch {
            seq,
            records: records.len(),
            intents,
            position,
        })
    })
    .await
    .context("Planning task panicked")?
}

/// One step of the capture loop.
enum Captured<T> {
    Record(Result<Record<StreamPosition<T>>>),
    Idle,
    End,
}

/// Read the source and group records into batches.
///
/// A partial batch is flushed when the source stays idle for
/// `flush_interval`, so a quiet stream still makes progress. The source is
/// driven through a stream, so an in-flight `next_record` call survives idle
/// ticks and is never dropped halfway.
fn spawn_capture<T, S>(
    source: S,
    tx: mpsc::Sender<Result<Batch<T>>>,
    batch_size: usize,
    flush_interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<Result<()>>
where
    T: Position,
    S: CaptureSource<T> + 'static,
{
    tokio::spawn(async move {
        let mut records = Box::pin(futures::stream::unfold(source, |mut source| async move {
            source.next_record().await.map(|record| (record, source))
        }));
        let mut batch: Batch<T> = Vec::with_capacity(batch_size);

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => return Ok(()),
                _ = tx.closed() => {
                    debug!("Batch queue closed, stopping capture");
                    return Ok(());
                }
                next = records.next() => match next {
                    Some(record) => Captured::Record(record),
                    None => Captured::End,
                },
                _ = tokio::time::sleep(flush_interval) => Captured::Idle,
            };

            match next {
                Captured::Idle => {
                    if !batch.is_empty() {
                        let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                        if tx.send(Ok(full)).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                Captured::Record(Ok(record)) => {
                    batch.push(record);
                    if batch.len() >= batch_size {
                        let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                        if tx.send(Ok(full)).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                Captured::Record(Err(e)) => {
                    // Records already read stay uncommitted; the error fails
                    // the run before any later batch executes.
                    let _ = tx.send(Err(e)).await;
                    return Ok(());
                }
                Captured::End => {
                    if !batch.is_empty() {
                        let _ = tx.send(Ok(batch)).await;
                    }
                    return Ok(());
                }
            }
        }
    })
}
