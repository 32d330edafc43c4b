//! Unit tests for the checkpoint crate.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::{
    Checkpoint, CheckpointConfig, CheckpointCoordinator, CheckpointID, CheckpointStorage,
    CheckpointStore, FilesystemStore, MemoryStore, NullStore, RetryPolicy, StoredCheckpoint,
    TaskKind,
};

/// Test checkpoint type for unit tests.
///
/// Exercises the trait implementation without a real capture source.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct TestCheckpoint {
    sequence_id: i64,
}

impl Checkpoint for TestCheckpoint {
    const DATABASE_TYPE: &'static str = "test";

    fn to_cli_string(&self) -> String {
        self.sequence_id.to_string()
    }

    fn from_cli_string(s: &str) -> anyhow::Result<Self> {
        Ok(Self {
            sequence_id: s.parse()?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct OtherCheckpoint {
    sequence_id: i64,
}

impl Checkpoint for OtherCheckpoint {
    const DATABASE_TYPE: &'static str = "other";

    fn to_cli_string(&self) -> String {
        self.sequence_id.to_string()
    }

    fn from_cli_string(s: &str) -> anyhow::Result<Self> {
        Ok(Self {
            sequence_id: s.parse()?,
        })
    }
}

/// Store that fails a fixed number of times before delegating.
struct FlakyStore {
    failures_left: AtomicU32,
    calls: AtomicU32,
    inner: MemoryStore,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            inner: MemoryStore::new(),
        }
    }
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn store_checkpoint(
        &self,
        id: &CheckpointID,
        checkpoint_data: String,
    ) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("disk full");
        }
        self.inner.store_checkpoint(id, checkpoint_data).await
    }

    async fn read_checkpoint(&self, id: &CheckpointID) -> anyhow::Result<Option<StoredCheckpoint>> {
        self.inner.read_checkpoint(id).await
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    }
}

// ============================================================================
// StoredCheckpoint Tests
// ============================================================================

#[test]
fn test_stored_checkpoint_type_mismatch() {
    let stored = StoredCheckpoint {
        checkpoint_data: r#"{"sequence_id": 42}"#.to_string(),
        database_type: "wrong".to_string(),
        task: TaskKind::Incremental,
        created_at: chrono::Utc::now(),
    };

    let result: anyhow::Result<TestCheckpoint> = stored.parse();
    let err_msg = result.unwrap_err().to_string();
    assert!(err_msg.contains("type mismatch"));
    assert!(err_msg.contains("expected 'test'"));
    assert!(err_msg.contains("found 'wrong'"));
}

// ============================================================================
// TaskKind / RetryPolicy Tests
// ============================================================================

#[test]
fn test_task_kind_as_str() {
    assert_eq!(TaskKind::Inventory.as_str(), "inventory");
    assert_eq!(format!("{}", TaskKind::Incremental), "incremental");
    assert_eq!("inventory".parse::<TaskKind>().unwrap(), TaskKind::Inventory);
    assert!("snapshot".parse::<TaskKind>().is_err());
}

#[test]
fn test_retry_backoff_doubles_and_caps() {
    let policy = RetryPolicy {
        max_attempts: 10,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(500),
    };
    assert_eq!(policy.backoff(1), Duration::from_millis(100));
    assert_eq!(policy.backoff(2), Duration::from_millis(200));
    assert_eq!(policy.backoff(3), Duration::from_millis(400));
    assert_eq!(policy.backoff(4), Duration::from_millis(500));
    assert_eq!(policy.backoff(40), Duration::from_millis(500));
}

#[test]
fn test_checkpoint_config_default() {
    let config = CheckpointConfig::default();
    assert!(config.is_enabled());
    assert!(matches!(
        config.storage,
        CheckpointStorage::Filesystem { ref dir } if dir == ".reshard-sync-checkpoints"
    ));
    assert!(!CheckpointConfig::disabled().is_enabled());
}

// ============================================================================
// Store Tests
// ============================================================================

#[tokio::test]
async fn test_filesystem_store_overwrites_single_file() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path());
    let id = CheckpointID::new("orders/reshard", "test", TaskKind::Incremental);

    store.store_checkpoint(&id, "1".to_string()).await.unwrap();
    store.store_checkpoint(&id, "2".to_string()).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
    assert_eq!(
        store.path_for(&id).file_name().unwrap().to_string_lossy(),
        "checkpoint_orders_reshard_incremental.json"
    );

    let stored = store.read_checkpoint(&id).await.unwrap().unwrap();
    assert_eq!(stored.checkpoint_data, "2");
    assert_eq!(stored.task, TaskKind::Incremental);
}

#[tokio::test]
async fn test_filesystem_store_missing_dir() {
    let tmp = TempDir::new().unwrap();
    let store = FilesystemStore::new(tmp.path().join("does-not-exist"));
    let id = CheckpointID::new("job", "test", TaskKind::Inventory);
    assert!(store.read_checkpoint(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_null_store_discards() {
    let id = CheckpointID::new("job", "test", TaskKind::Inventory);
    NullStore.store_checkpoint(&id, "1".to_string()).await.unwrap();
    assert!(NullStore.read_checkpoint(&id).await.unwrap().is_none());
}

// ============================================================================
// CheckpointCoordinator Tests
// ============================================================================

#[tokio::test]
async fn test_coordinator_save_load_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let config = CheckpointConfig::filesystem(tmp.path().to_string_lossy().to_string());
    let coordinator = CheckpointCoordinator::from_config(&config, "job-1", TaskKind::Incremental);

    let loaded: Option<TestCheckpoint> = coordinator.load_position().await.unwrap();
    assert!(loaded.is_none());

    coordinator
        .save_position(&TestCheckpoint { sequence_id: 7 })
        .await
        .unwrap();
    coordinator
        .save_position(&TestCheckpoint { sequence_id: 9 })
        .await
        .unwrap();

    let loaded: Option<TestCheckpoint> = coordinator.load_position().await.unwrap();
    assert_eq!(loaded, Some(TestCheckpoint { sequence_id: 9 }));
}

#[tokio::test]
async fn test_coordinator_jobs_do_not_share_checkpoints() {
    let store: Arc<dyn CheckpointStore> = Arc::new(MemoryStore::new());
    let job_a = CheckpointCoordinator::new(store.clone(), "job-a", TaskKind::Incremental);
    let job_b = CheckpointCoordinator::new(store.clone(), "job-b", TaskKind::Incremental);
    let job_a_inventory = CheckpointCoordinator::new(store, "job-a", TaskKind::Inventory);

    job_a
        .save_position(&TestCheckpoint { sequence_id: 1 })
        .await
        .unwrap();

    assert!(job_b.load_position::<TestCheckpoint>().await.unwrap().is_none());
    assert!(job_a_inventory
        .load_position::<TestCheckpoint>()
        .await
        .unwrap()
        .is_none());
    assert!(job_a.load_position::<OtherCheckpoint>().await.unwrap().is_none());
}

#[tokio::test]
async fn test_coordinator_retries_then_succeeds() {
    let store = Arc::new(FlakyStore::new(2));
    let coordinator = CheckpointCoordinator::new(store.clone(), "job", TaskKind::Incremental)
        .with_retry(fast_retry(3));

    coordinator
        .save_position(&TestCheckpoint { sequence_id: 3 })
        .await
        .unwrap();
    assert_eq!(store.calls.load(Ordering::SeqCst), 3);

    let loaded: Option<TestCheckpoint> = coordinator.load_position().await.unwrap();
    assert_eq!(loaded, Some(TestCheckpoint { sequence_id: 3 }));
}

#[tokio::test]
async fn test_coordinator_reports_io_error_after_last_attempt() {
    let store = Arc::new(FlakyStore::new(10));
    let coordinator = CheckpointCoordinator::new(store.clone(), "job", TaskKind::Incremental)
        .with_retry(fast_retry(2));

    let err = coordinator
        .save_position(&TestCheckpoint { sequence_id: 3 })
        .await
        .unwrap_err();
    assert_eq!(err.attempts, 2);
    assert_eq!(err.job_id, "job");
    assert!(err.to_string().contains("disk full"));
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}
