//! Tracking the last position that is safe to checkpoint.

use tracing::{debug, warn};

use crate::position::Position;
use crate::record::Record;

/// Last record of `records` whose position is not a placeholder.
///
/// Scans backward and returns on the first match, so when several records
/// share a position the most recently arrived one wins. Returns `None` when
/// the batch holds only placeholders, meaning there is nothing to checkpoint.
pub fn get_last_normal_record<P: Position>(records: &[Record<P>]) -> Option<&Record<P>> {
    records
        .iter()
        .rev()
        .find(|record| !record.position().is_placeholder())
}

/// Position bookkeeping for one migration job.
///
/// The tracker owns the last confirmed position and nothing else. Each job
/// gets its own instance, so jobs running in one process never share state.
#[derive(Debug)]
pub struct PositionTracker<P> {
    job_id: String,
    confirmed: Option<P>,
}

impl<P: Position> PositionTracker<P> {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            confirmed: None,
        }
    }

    /// Start from a position loaded from the checkpoint store.
    pub fn resume_from(job_id: impl Into<String>, position: Option<P>) -> Self {
        Self {
            job_id: job_id.into(),
            confirmed: position.filter(|p| !p.is_placeholder()),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Last position confirmed as applied.
    pub fn confirmed(&self) -> Option<&P> {
        self.confirmed.as_ref()
    }

    /// Position the batch would advance the job to once it commits.
    pub fn pending_position(&self, records: &[Record<P>]) -> Option<P> {
        get_last_normal_record(records).map(|record| record.position().clone())
    }

    /// Record that everything up to `position` has been applied.
    ///
    /// Returns true when the confirmed position moved. Placeholders and
    /// positions behind the current one leave the tracker unchanged.
    pub fn confirm(&mut self, position: P) -> bool {
        if position.is_placeholder() {
            debug!(job_id = %self.job_id, "Ignoring placeholder position");
            return false;
        }

        match &self.confirmed {
            Some(current) if position < *current => {
                warn!(
                    job_id = %self.job_id,
                    "Refusing to move confirmed position back from {:?} to {:?}",
                    current,
                    position
                );
                false
            }
            Some(current) if position == *current => false,
            _ => {
                self.confirmed = Some(position);
                true
            }
        }
    }
}
