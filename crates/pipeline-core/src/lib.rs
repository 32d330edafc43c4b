//! Core types for the reshard-sync change pipeline.
//!
//! This crate holds everything that sits between a raw capture source and a
//! write executor:
//!
//! - [`Column`] / [`Record`] - the uniform record model for captured changes
//! - [`Position`] - the opaque, source-specific stream position
//! - [`extract`] - column subsets used to build lookups, WHERE and SET clauses
//! - [`PositionTracker`] - the last position that is safe to checkpoint
//!
//! # Architecture
//!
//! ```text
//! capture source ──► Record<P> ──► extract ──► apply-sink (planner) ──► executor
//!                        │
//!                        └──► PositionTracker ──► checkpoint (after commit)
//! ```
//!
//! # Example
//!
//! ```rust
//! use pipeline_core::{extract, Column, DataRecord, Lsn, OperationKind, StreamPosition};
//! use std::collections::HashSet;
//!
//! let record = DataRecord::new(
//!     "t_order",
//!     OperationKind::Update,
//!     StreamPosition::At(Lsn(0x1000)),
//!     vec![
//!         Column::new("id", 1).unique_key(true).updated(false),
//!         Column::new("region", "eu").updated(true),
//!     ],
//! );
//!
//! let sharding: HashSet<String> = ["region".to_string()].into();
//! let names: Vec<_> = extract::extract_condition_columns(&record, &sharding)
//!     .into_iter()
//!     .map(|c| c.name)
//!     .collect();
//! assert_eq!(names, ["id", "region"]);
//! ```

mod column;
pub mod error;
pub mod extract;
pub mod position;
mod record;
pub mod tracker;

pub use column::Column;
pub use error::{Error, Result};
pub use position::{BinlogPosition, Lsn, Position, StreamPosition};
pub use record::{
    DataRecord, OperationKind, PlaceholderReason, PlaceholderRecord, RawRecord, Record,
};
pub use tracker::{get_last_normal_record, PositionTracker};
