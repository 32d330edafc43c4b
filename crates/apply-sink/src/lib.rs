//! Write-intent planning and the executor abstraction.
//!
//! This crate turns normalized records from `pipeline-core` into ordered
//! write intents and defines the `WriteExecutor` trait the pipeline hands
//! them to. Executors that talk to real data sources live outside this
//! crate; `JsonLinesExecutor` and `InMemoryTarget` cover dry runs and tests.

mod executor;
mod intent;
mod jsonl;
mod memory;
mod planner;
mod sharding;
mod transaction;

pub use executor::WriteExecutor;
pub use intent::{IntentKind, WriteIntent};
pub use jsonl::JsonLinesExecutor;
pub use memory::{InMemoryTarget, Row};
pub use planner::ApplyPlanner;
pub use sharding::ShardingColumns;
pub use transaction::TransactionType;
