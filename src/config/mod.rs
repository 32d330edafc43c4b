//! Pipeline configuration.

mod duration;

use std::time::Duration;

use apply_sink::{ShardingColumns, TransactionType};
use checkpoint::{CheckpointConfig, CheckpointStorage, RetryPolicy};

use crate::ReplayOpts;

pub use duration::parse_duration;

/// Settings for one migration job's replay pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Job identifier, scoping checkpoints and log output
    pub job_id: String,

    /// Maximum records per batch (one transaction per batch)
    pub batch_size: usize,

    /// Capacity of the queue between capture and planning.
    ///
    /// Bounds how far capture may run ahead of the target.
    pub queue_capacity: usize,

    /// Batches planned concurrently
    pub plan_concurrency: usize,

    /// Flush a partial batch when the source is idle this long
    pub flush_interval: Duration,

    pub transaction_type: TransactionType,

    pub sharding: ShardingColumns,

    pub checkpoint: CheckpointConfig,
}

impl PipelineConfig {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            batch_size: 1000,
            queue_capacity: 16,
            plan_concurrency: 4,
            flush_interval: Duration::from_secs(1),
            transaction_type: TransactionType::Local,
            sharding: ShardingColumns::new(),
            checkpoint: CheckpointConfig::default(),
        }
    }

    /// Check the values a pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.job_id.trim().is_empty() {
            anyhow::bail!("Job id must not be empty");
        }
        if self.batch_size == 0 {
            anyhow::bail!("Batch size must be at least 1");
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("Queue capacity must be at least 1");
        }
        if self.plan_concurrency == 0 {
            anyhow::bail!("Plan concurrency must be at least 1");
        }
        Ok(())
    }
}

impl TryFrom<&ReplayOpts> for PipelineConfig {
    type Error = anyhow::Error;

    fn try_from(opts: &ReplayOpts) -> anyhow::Result<Self> {
        let storage = if opts.no_checkpoint {
            CheckpointStorage::Disabled
        } else {
            CheckpointStorage::Filesystem {
                dir: opts.checkpoint_dir.clone(),
            }
        };

        let config = Self {
            job_id: opts.job_id.clone(),
            batch_size: opts.batch_size,
            queue_capacity: opts.queue_capacity,
            plan_concurrency: opts.plan_concurrency,
            flush_interval: parse_duration(&opts.flush_interval)?,
            transaction_type: opts.transaction_type,
            sharding: ShardingColumns::parse(&opts.sharding_columns)?,
            checkpoint: CheckpointConfig {
                storage,
                retry: RetryPolicy {
                    max_attempts: opts.checkpoint_retries.max(1),
                    initial_backoff: parse_duration(&opts.checkpoint_backoff)?,
                    ..RetryPolicy::default()
                },
            },
        };
        config.validate()?;
        Ok(config)
    }
}
