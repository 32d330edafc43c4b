//! Write executor abstraction.

use anyhow::Result;

use crate::intent::WriteIntent;
use crate::transaction::TransactionType;

/// Trait for applying planned writes to the target topology.
///
/// The executor receives one batch per call and must apply all of it or none
/// of it, inside one transaction of the given type. The pipeline checkpoints a
/// batch only after this returns `Ok`, which is what makes resuming from the
/// checkpoint safe.
///
/// # Usage Pattern
///
/// ```ignore
/// let intents = planner.plan_batch(&records)?;
/// executor.execute_batch(TransactionType::Xa, &intents).await?;
/// coordinator.save_position(&position).await?;
/// ```
#[async_trait::async_trait]
pub trait WriteExecutor: Send + Sync {
    /// Apply every intent of one batch atomically, in order.
    async fn execute_batch(
        &self,
        transaction: TransactionType,
        intents: &[WriteIntent],
    ) -> Result<()>;
}
