//! Loading and saving job positions.

use std::sync::Arc;

use crate::{
    store::CheckpointStore, Checkpoint, CheckpointConfig, CheckpointID, CheckpointIoError,
    RetryPolicy, TaskKind,
};

/// Loads and saves the checkpointed position of one job task.
///
/// Callers save a position only after the writes up to it have committed.
/// A failed save is retried with backoff and then reported as
/// [`CheckpointIoError`]; it never undoes the committed writes.
///
/// # Example
///
/// ```rust,ignore
/// use checkpoint::{CheckpointConfig, CheckpointCoordinator, TaskKind};
///
/// let config = CheckpointConfig::filesystem("/tmp/checkpoints");
/// let coordinator =
///     CheckpointCoordinator::from_config(&config, "order-reshard", TaskKind::Incremental);
///
/// let resume: Option<Lsn> = coordinator.load_position().await?;
/// coordinator.save_position(&Lsn(0x1949850)).await?;
/// ```
pub struct CheckpointCoordinator {
    store: Arc<dyn CheckpointStore>,
    job_id: String,
    task: TaskKind,
    retry: RetryPolicy,
}

impl CheckpointCoordinator {
    pub fn new(store: Arc<dyn CheckpointStore>, job_id: impl Into<String>, task: TaskKind) -> Self {
        Self {
            store,
            job_id: job_id.into(),
            task,
            retry: RetryPolicy::default(),
        }
    }

    /// Build a coordinator backed by the configured storage.
    pub fn from_config(
        config: &CheckpointConfig,
        job_id: impl Into<String>,
        task: TaskKind,
    ) -> Self {
        Self::new(config.storage.build(), job_id, task).with_retry(config.retry)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    fn checkpoint_id<C: Checkpoint>(&self) -> CheckpointID {
        CheckpointID::new(&self.job_id, C::DATABASE_TYPE, self.task)
    }

    /// Read the last saved position, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the stored checkpoint
    /// belongs to a different source type.
    pub async fn load_position<C: Checkpoint>(&self) -> anyhow::Result<Option<C>> {
        let id = self.checkpoint_id::<C>();
        let Some(stored) = self.store.read_checkpoint(&id).await? else {
            tracing::info!(job_id = %self.job_id, task = %self.task, "No checkpoint found");
            return Ok(None);
        };

        let position = stored.parse::<C>()?;
        tracing::info!(
            job_id = %self.job_id,
            task = %self.task,
            "Loaded checkpoint {} (saved at {})",
            position.to_cli_string(),
            stored.created_at.to_rfc3339()
        );
        Ok(Some(position))
    }

    /// Persist `position`, retrying with backoff on failure.
    pub async fn save_position<C: Checkpoint>(
        &self,
        position: &C,
    ) -> Result<(), CheckpointIoError> {
        let id = self.checkpoint_id::<C>();
        let data = serde_json::to_string(position).map_err(|e| CheckpointIoError {
            job_id: self.job_id.clone(),
            attempts: 0,
            source: e.into(),
        })?;

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.store_checkpoint(&id, data.clone()).await {
                Ok(()) => {
                    tracing::debug!(
                        job_id = %self.job_id,
                        task = %self.task,
                        "Saved checkpoint {}",
                        position.to_cli_string()
                    );
                    return Ok(());
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        job_id = %self.job_id,
                        "Checkpoint save attempt {attempt}/{max_attempts} failed: {e}. Retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(CheckpointIoError {
                        job_id: self.job_id.clone(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}
