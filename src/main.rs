//! Command-line interface for reshard-sync
//!
//! # Usage Examples
//!
//! ## Replay
//! ```bash
//! # Replay a WAL capture, writing one JSON line per committed batch
//! reshard-sync replay \
//!   --records changes.jsonl \
//!   --job-id job-1 \
//!   --sharding-column t_order.user_id \
//!   --transaction-type XA
//!
//! # Replay a binlog capture against an in-memory target
//! reshard-sync replay --records binlog.jsonl --job-id job-2 \
//!   --source-type mysql-binlog --dry-run
//! ```
//!
//! ## Checkpoints
//! ```bash
//! reshard-sync checkpoint show --job-id job-1
//! ```
//!
//! ## Position Formats
//! - PostgreSQL WAL: `0/16B3748` (hex LSN)
//! - MySQL binlog: `mysql-bin.000003:4` (file name and offset)

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use apply_sink::{InMemoryTarget, JsonLinesExecutor, WriteExecutor};
use checkpoint::{Checkpoint, CheckpointConfig, CheckpointCoordinator, CheckpointStorage, TaskKind};
use clap::{Parser, Subcommand};
use pipeline_core::{BinlogPosition, Lsn, Position};
use reshard_sync::{CheckpointOpts, JsonlSource, Pipeline, PipelineConfig, ReplayOpts, SourceType};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "reshard-sync")]
#[command(about = "Replay captured row changes onto a resharded target")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a captured record stream, checkpointing after each committed batch
    Replay {
        #[command(flatten)]
        opts: ReplayOpts,
    },

    /// Inspect saved checkpoints
    Checkpoint {
        #[command(subcommand)]
        command: CheckpointCommand,
    },
}

#[derive(Subcommand)]
enum CheckpointCommand {
    /// Print the position a job would resume from
    Show {
        #[command(flatten)]
        opts: CheckpointOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { opts } => match opts.source_type {
            SourceType::PostgresqlWal => run_replay::<Lsn>(opts).await,
            SourceType::MysqlBinlog => run_replay::<BinlogPosition>(opts).await,
        },
        Commands::Checkpoint {
            command: CheckpointCommand::Show { opts },
        } => match opts.source_type {
            SourceType::PostgresqlWal => show_checkpoint::<Lsn>(&opts).await,
            SourceType::MysqlBinlog => show_checkpoint::<BinlogPosition>(&opts).await,
        },
    }
}

async fn run_replay<T>(opts: ReplayOpts) -> anyhow::Result<()>
where
    T: Position + Checkpoint + FromStr<Err = pipeline_core::Error>,
{
    let mut config = PipelineConfig::try_from(&opts)?;
    if opts.dry_run {
        info!("Dry run: applying to an in-memory target, checkpoints are not persisted");
        config.checkpoint.storage = CheckpointStorage::Memory;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch");
            let _ = shutdown_tx.send(true);
        }
    });

    let source = JsonlSource::<T, _>::open(&opts.records).await?;

    let target = Arc::new(InMemoryTarget::new());
    let executor: Arc<dyn WriteExecutor> = if opts.dry_run {
        target.clone()
    } else {
        Arc::new(JsonLinesExecutor::stdout())
    };

    let pipeline = Pipeline::new(config, executor)?;
    let report = pipeline.run(source, shutdown_rx).await?;

    if opts.dry_run {
        for table in target.table_names().await {
            for row in target.rows(&table).await {
                println!("{table}: {}", serde_json::to_string(&row)?);
            }
        }
    }

    info!("{}", serde_json::to_string(&report)?);
    if report.interrupted {
        warn!(
            "Replay interrupted; rerun with job id '{}' to resume",
            pipeline.config().job_id
        );
    }
    Ok(())
}

async fn show_checkpoint<T: Checkpoint>(opts: &CheckpointOpts) -> anyhow::Result<()> {
    let coordinator = CheckpointCoordinator::from_config(
        &CheckpointConfig::filesystem(opts.checkpoint_dir.clone()),
        opts.job_id.clone(),
        TaskKind::Incremental,
    );
    let position = coordinator
        .load_position::<T>()
        .await
        .with_context(|| format!("Failed to read checkpoint for job '{}'", opts.job_id))?;

    match position {
        Some(position) => println!("{}:{}", T::DATABASE_TYPE, position.to_cli_string()),
        None => println!("No checkpoint for job '{}'", opts.job_id),
    }
    Ok(())
}
