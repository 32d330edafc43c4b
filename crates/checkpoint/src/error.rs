use thiserror::Error;

/// Persisting a checkpoint failed after every retry.
///
/// The writes the checkpoint describes are already committed, so callers
/// report this and keep going. The worst case is re-delivery on restart.
#[derive(Debug, Error)]
#[error("Failed to store checkpoint for job '{job_id}' after {attempts} attempt(s): {source}")]
pub struct CheckpointIoError {
    pub job_id: String,
    pub attempts: u32,
    #[source]
    pub source: anyhow::Error,
}
