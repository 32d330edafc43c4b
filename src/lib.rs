//! reshard-sync library
//!
//! Replays captured row changes onto a resharded target during an online
//! migration. Records are normalized by `pipeline_core`, planned into write
//! intents by `apply_sink`, executed one transaction per batch, and the last
//! committed position is checkpointed so a restarted job resumes from there.
//!
//! # Crates
//!
//! - `pipeline_core` - record model, column extraction, position tracking
//! - `apply_sink` - write-intent planning and the `WriteExecutor` trait
//! - `checkpoint` - checkpoint stores and the retrying coordinator
//!
//! # CLI Usage
//!
//! ```bash
//! # Replay a captured WAL stream, printing the planned batches
//! reshard-sync replay --records changes.jsonl --job-id job-1 \
//!   --sharding-column t_order.user_id --transaction-type XA
//!
//! # Show where a job would resume
//! reshard-sync checkpoint show --job-id job-1
//! ```

use apply_sink::TransactionType;
use clap::{Parser, ValueEnum};

pub mod config;
pub mod pipeline;
pub mod source;

pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineReport};
pub use source::{CaptureSource, JsonlSource, MemorySource};

/// Kind of change stream the captured records came from.
///
/// Determines how position strings are parsed and how checkpoints are
/// tagged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceType {
    /// PostgreSQL WAL, positions like `0/16B3748`
    #[value(name = "postgresql-wal")]
    PostgresqlWal,
    /// MySQL binlog, positions like `mysql-bin.000003:4`
    #[value(name = "mysql-binlog")]
    MysqlBinlog,
}

#[derive(Parser, Clone, Debug)]
pub struct CheckpointOpts {
    /// Migration job identifier
    #[arg(long, env = "RESHARD_JOB_ID")]
    pub job_id: String,

    /// Directory holding checkpoint files
    #[arg(
        long,
        default_value = ".reshard-sync-checkpoints",
        env = "RESHARD_CHECKPOINT_DIR"
    )]
    pub checkpoint_dir: String,

    /// Source the job captures from
    #[arg(long, value_enum, default_value = "postgresql-wal")]
    pub source_type: SourceType,
}

#[derive(Parser, Clone, Debug)]
pub struct ReplayOpts {
    /// JSON-lines file of captured records
    #[arg(long, value_name = "FILE")]
    pub records: String,

    /// Migration job identifier
    #[arg(long, env = "RESHARD_JOB_ID")]
    pub job_id: String,

    /// Source the records were captured from
    #[arg(long, value_enum, default_value = "postgresql-wal")]
    pub source_type: SourceType,

    /// Sharding column, as `table.column` or `column` for every table.
    /// May be repeated.
    #[arg(long = "sharding-column", value_name = "COLUMN")]
    pub sharding_columns: Vec<String>,

    /// Transaction type for each batch (LOCAL, XA or BASE)
    #[arg(long, default_value = "LOCAL", env = "RESHARD_TRANSACTION_TYPE")]
    pub transaction_type: TransactionType,

    /// Maximum records per batch
    #[arg(long, default_value = "1000", env = "RESHARD_BATCH_SIZE")]
    pub batch_size: usize,

    /// Batches buffered between capture and planning
    #[arg(long, default_value = "16")]
    pub queue_capacity: usize,

    /// Batches planned concurrently
    #[arg(long, default_value = "4")]
    pub plan_concurrency: usize,

    /// Flush a partial batch after the source is idle this long (e.g. "500ms", "1s")
    #[arg(long, default_value = "1s")]
    pub flush_interval: String,

    /// Directory holding checkpoint files
    #[arg(
        long,
        default_value = ".reshard-sync-checkpoints",
        env = "RESHARD_CHECKPOINT_DIR"
    )]
    pub checkpoint_dir: String,

    /// Do not load or save checkpoints
    #[arg(long)]
    pub no_checkpoint: bool,

    /// Attempts per checkpoint save before giving up on it
    #[arg(long, default_value = "5")]
    pub checkpoint_retries: u32,

    /// Initial backoff between checkpoint save attempts
    #[arg(long, default_value = "100ms")]
    pub checkpoint_backoff: String,

    /// Dry run mode - apply to an in-memory target and print the resulting rows
    #[arg(long)]
    pub dry_run: bool,
}
