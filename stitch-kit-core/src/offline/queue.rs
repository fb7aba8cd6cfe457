//! Durable queue of pending mutations awaiting remote synchronization.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Kind of mutation a pending operation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// One not-yet-synchronized mutation.
///
/// Created by whichever caller performed the local mutation, held until its
/// remote sync attempt succeeds, surviving process restarts in between. The
/// payload is the entity's serialized form at enqueue time; the queue never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub id: Uuid,
    pub kind: OperationKind,
    pub entity_type: String,
    pub entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(kind: OperationKind, entity_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            entity_type: entity_type.into(),
            entity_id: None,
            payload: None,
            enqueued_at: Utc::now(),
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Errors that can occur while persisting or loading the queue.
#[derive(Debug)]
pub enum QueueError {
    /// I/O error reading or writing the queue file.
    Io(PathBuf, io::Error),
    /// Error serializing or parsing the queue file.
    Serialize(String),
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Io(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            QueueError::Serialize(e) => write!(f, "Failed to serialize queue: {}", e),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Io(_, e) => Some(e),
            QueueError::Serialize(_) => None,
        }
    }
}

/// Ordered, durable list of pending operations.
///
/// Every mutating call rewrites the whole serialized list before returning,
/// so the file on disk is always a complete snapshot and never a partial
/// append. In-memory state is rolled back when a write fails; it is never
/// ahead of disk.
pub struct OperationQueue {
    path: PathBuf,
    ops: Mutex<Vec<PendingOperation>>,
    draining: AtomicBool,
}

impl OperationQueue {
    /// Opens the queue at `path`, loading any operations a previous process
    /// left behind. A missing file is an empty queue.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let path = path.into();
        let ops = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| QueueError::Serialize(e.to_string()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(QueueError::Io(path, e)),
        };
        Ok(Self {
            path,
            ops: Mutex::new(ops),
            draining: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an operation and persists the full list before returning.
    ///
    /// After this call returns Ok, the operation survives a process crash.
    pub async fn enqueue(&self, op: PendingOperation) -> Result<(), QueueError> {
        let mut ops = self.ops.lock().await;
        tracing::debug!(
            "queueing {} {} ({} already pending)",
            op.kind,
            op.entity_type,
            ops.len()
        );
        ops.push(op);
        if let Err(e) = persist(&self.path, &ops) {
            ops.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Attempts to synchronize every currently-pending operation, in FIFO
    /// order. A failed operation is left in place and does not block later
    /// entries. Succeeded operations are removed in one batch afterwards and
    /// the shrunken list persisted.
    ///
    /// Returns the number of operations retired. A `drain` that starts while
    /// another is still running is a no-op returning 0.
    pub async fn drain<F, Fut, E>(&self, sync_fn: F) -> Result<usize, QueueError>
    where
        F: Fn(PendingOperation) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        if self.draining.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }
        let result = self.drain_pass(sync_fn).await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn drain_pass<F, Fut, E>(&self, sync_fn: F) -> Result<usize, QueueError>
    where
        F: Fn(PendingOperation) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let snapshot: Vec<PendingOperation> = self.ops.lock().await.clone();
        if snapshot.is_empty() {
            return Ok(0);
        }

        let mut retired: Vec<Uuid> = Vec::new();
        for op in snapshot {
            let id = op.id;
            if sync_fn(op).await.is_ok() {
                retired.push(id);
            }
        }
        if retired.is_empty() {
            return Ok(0);
        }

        let mut ops = self.ops.lock().await;
        let kept: Vec<PendingOperation> = ops
            .iter()
            .filter(|op| !retired.contains(&op.id))
            .cloned()
            .collect();
        // Persist first: if the write fails, memory keeps matching disk and
        // the retired operations simply sync again on the next trigger.
        persist(&self.path, &kept)?;
        *ops = kept;
        tracing::debug!("drain retired {} operation(s)", retired.len());
        Ok(retired.len())
    }

    pub async fn pending_count(&self) -> usize {
        self.ops.lock().await.len()
    }

    /// Read-only snapshot in insertion order.
    pub async fn all(&self) -> Vec<PendingOperation> {
        self.ops.lock().await.clone()
    }
}

fn persist(path: &Path, ops: &[PendingOperation]) -> Result<(), QueueError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| QueueError::Io(parent.to_path_buf(), e))?;
    }
    let json =
        serde_json::to_vec_pretty(ops).map_err(|e| QueueError::Serialize(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| QueueError::Io(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_queue() -> (OperationQueue, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let queue = OperationQueue::open(temp_dir.path().join("pending-ops.json")).unwrap();
        (queue, temp_dir)
    }

    fn op(kind: OperationKind, entity_id: &str) -> PendingOperation {
        PendingOperation::new(kind, "project").with_entity_id(entity_id)
    }

    #[tokio::test]
    async fn test_enqueue_assigns_identity() {
        let (queue, _temp) = test_queue();
        let before = Utc::now();
        let pending = op(OperationKind::Create, "p1");
        assert!(pending.enqueued_at >= before);

        queue.enqueue(pending).await.unwrap();
        assert_eq!(queue.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_queue_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pending-ops.json");

        let queue = OperationQueue::open(&path).unwrap();
        queue.enqueue(op(OperationKind::Create, "p1")).await.unwrap();
        queue.enqueue(op(OperationKind::Update, "p2")).await.unwrap();
        queue.enqueue(op(OperationKind::Delete, "p3")).await.unwrap();
        let before = queue.all().await;
        drop(queue);

        // Simulated crash: a fresh process opens the same file.
        let reopened = OperationQueue::open(&path).unwrap();
        assert_eq!(reopened.all().await, before);
    }

    #[tokio::test]
    async fn test_drain_fifo_with_partial_failure() {
        let (queue, _temp) = test_queue();
        queue.enqueue(op(OperationKind::Create, "a")).await.unwrap();
        queue.enqueue(op(OperationKind::Update, "b")).await.unwrap();
        queue.enqueue(op(OperationKind::Delete, "c")).await.unwrap();

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = order.clone();
        let completed = queue
            .drain(move |op| {
                let seen = seen.clone();
                async move {
                    let entity_id = op.entity_id.clone().unwrap();
                    seen.lock().unwrap().push(entity_id.clone());
                    if entity_id == "b" {
                        Err("remote rejected")
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(completed, 2);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);

        let remaining = queue.all().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].entity_id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_drain_single_flight() {
        let (queue, _temp) = test_queue();
        for i in 0..4 {
            queue
                .enqueue(op(OperationKind::Create, &format!("p{}", i)))
                .await
                .unwrap();
        }

        let processed = Arc::new(AtomicUsize::new(0));
        let sync_fn = |processed: Arc<AtomicUsize>| {
            move |_op: PendingOperation| {
                let processed = processed.clone();
                async move {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    processed.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), &str>(())
                }
            }
        };

        let (first, second) = tokio::join!(
            queue.drain(sync_fn(processed.clone())),
            queue.drain(sync_fn(processed.clone()))
        );

        let mut counts = [first.unwrap(), second.unwrap()];
        counts.sort_unstable();
        assert_eq!(counts, [0, 4]);
        // No operation processed twice.
        assert_eq!(processed.load(Ordering::SeqCst), 4);
        assert_eq!(queue.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let (queue, _temp) = test_queue();
        let completed = queue
            .drain(|_op| async { Ok::<(), &str>(()) })
            .await
            .unwrap();
        assert_eq!(completed, 0);
    }

    #[tokio::test]
    async fn test_enqueue_rolls_back_on_persist_failure() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pending-ops.json");
        let queue = OperationQueue::open(&path).unwrap();

        // Occupy the queue's path with a directory so the write must fail.
        std::fs::create_dir(&path).unwrap();

        let result = queue.enqueue(op(OperationKind::Create, "p1")).await;
        assert!(result.is_err());
        assert_eq!(queue.pending_count().await, 0);
    }

    #[test]
    fn test_open_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pending-ops.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(OperationQueue::open(&path).is_err());
    }

    #[test]
    fn test_operation_json_roundtrip() {
        let pending = PendingOperation::new(OperationKind::Delete, "fabric")
            .with_entity_id("f1")
            .with_payload(vec![1, 2, 3]);

        let json = serde_json::to_string(&pending).unwrap();
        assert!(json.contains("\"delete\""));

        let parsed: PendingOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pending);
    }
}
