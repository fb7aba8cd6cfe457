//! Bridges connectivity transitions to queue draining.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::cache::ContentCache;
use super::connectivity::ConnectionState;
use super::queue::{OperationQueue, PendingOperation, QueueError};
use crate::sync::{RemoteSync, SyncError};

/// Synchronization phase state machine
///
/// Pure type with only state definitions and transition logic; the runtime
/// behavior lives in [`SyncCoordinator`].
///
/// State transitions:
///
/// ```text
/// Offline ──→ OnlineIdle ──→ OnlineDraining
///    ↑            ↑                │
///    │            └────────────────┘
///    └── any state, on disconnect
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    /// No connectivity; mutations accumulate in the queue
    Offline,

    /// Connected with no drain in progress
    OnlineIdle,

    /// Connected and replaying queued operations
    OnlineDraining,
}

impl SyncPhase {
    pub fn is_online(self) -> bool {
        !matches!(self, Self::Offline)
    }

    pub fn is_draining(self) -> bool {
        self == Self::OnlineDraining
    }

    /// Transition on a connectivity change to connected.
    pub fn on_connected(self) -> Self {
        match self {
            Self::Offline => Self::OnlineIdle,
            other => other,
        }
    }

    /// Transition on a connectivity change to disconnected. Valid from any
    /// state; an in-flight drain finishes its current operation elsewhere.
    pub fn on_disconnected(self) -> Self {
        Self::Offline
    }

    /// Start draining. Only valid while idle online.
    pub fn drain_started(self) -> Option<Self> {
        match self {
            Self::OnlineIdle => Some(Self::OnlineDraining),
            _ => None,
        }
    }

    /// Transition after a drain pass completes, whether or not every
    /// operation succeeded.
    pub fn drain_finished(self) -> Self {
        match self {
            Self::OnlineDraining => Self::OnlineIdle,
            other => other,
        }
    }
}

impl Default for SyncPhase {
    fn default() -> Self {
        Self::Offline
    }
}

/// Receives per-operation sync failures during a drain.
///
/// Transient failures are expected in an offline-first design, so they are
/// reported here instead of escalating; the operation stays queued for the
/// next trigger.
pub trait SyncFailureSink: Send + Sync {
    fn sync_failed(&self, op: &PendingOperation, error: &SyncError);
}

/// Default sink: logs and moves on.
pub struct LogSink;

impl SyncFailureSink for LogSink {
    fn sync_failed(&self, op: &PendingOperation, error: &SyncError) {
        tracing::warn!(
            "sync: {} {} ({}) failed, keeping queued: {}",
            op.kind,
            op.entity_type,
            op.entity_id.as_deref().unwrap_or("-"),
            error
        );
    }
}

/// Reacts to connectivity transitions, drains the queue against the remote
/// endpoint, and exposes a single status view to callers.
///
/// All state transitions execute serially on one background task;
/// connectivity observations and enqueue notifications reach it through
/// channels, never as direct calls.
pub struct SyncCoordinator {
    queue: Arc<OperationQueue>,
    cache: Arc<ContentCache>,
    connectivity: watch::Receiver<ConnectionState>,
    phase_rx: watch::Receiver<SyncPhase>,
    trigger_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncCoordinator {
    /// Starts the coordinator task with the default logging failure sink.
    /// Must be called from within a tokio runtime.
    pub fn start(
        queue: Arc<OperationQueue>,
        cache: Arc<ContentCache>,
        remote: Arc<dyn RemoteSync>,
        connectivity: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self::start_with_sink(queue, cache, remote, connectivity, Arc::new(LogSink))
    }

    /// Starts the coordinator task with an injected failure sink.
    pub fn start_with_sink(
        queue: Arc<OperationQueue>,
        cache: Arc<ContentCache>,
        remote: Arc<dyn RemoteSync>,
        connectivity: watch::Receiver<ConnectionState>,
        sink: Arc<dyn SyncFailureSink>,
    ) -> Self {
        let (phase_tx, phase_rx) = watch::channel(SyncPhase::Offline);
        let (trigger_tx, trigger_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_loop(
            queue.clone(),
            remote,
            sink,
            connectivity.clone(),
            trigger_rx,
            phase_tx,
        ));
        Self {
            queue,
            cache,
            connectivity,
            phase_rx,
            trigger_tx,
            task,
        }
    }

    /// Enqueues a mutation for remote replay. If the coordinator is
    /// currently online and idle, a drain starts shortly afterwards.
    pub async fn queue_operation(&self, op: PendingOperation) -> Result<(), QueueError> {
        self.queue.enqueue(op).await?;
        // Offline enqueues don't need a wake-up; the reconnect edge drains
        // everything. A full channel already holds one.
        if self.phase_rx.borrow().is_online() {
            let _ = self.trigger_tx.try_send(());
        }
        Ok(())
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase_rx.borrow()
    }

    /// Subscribes to phase transitions.
    pub fn phase_updates(&self) -> watch::Receiver<SyncPhase> {
        self.phase_rx.clone()
    }

    pub async fn has_pending_operations(&self) -> bool {
        self.queue.pending_count().await > 0
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.pending_count().await
    }

    /// Human-readable composite of connectivity, pending work, and cache
    /// presence, for display surfaces.
    pub async fn status_text(&self) -> String {
        let state = *self.connectivity.borrow();
        let pending = self.queue.pending_count().await;
        let info = self.cache.info().await;

        let connection = if state.is_connected {
            format!("Online ({})", state.transport)
        } else {
            "Offline".to_string()
        };
        let changes = match pending {
            0 => "no pending changes".to_string(),
            1 => "1 pending change".to_string(),
            n => format!("{} pending changes", n),
        };
        let cached = match info.keys.len() {
            0 => "cache empty".to_string(),
            1 => "1 cached collection".to_string(),
            n => format!("{} cached collections", n),
        };
        format!("{}, {}, {}", connection, changes, cached)
    }

    /// Stops the coordinator task. A drain in progress is abandoned after
    /// its current operation; nothing is marked complete without a
    /// successful sync.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_loop(
    queue: Arc<OperationQueue>,
    remote: Arc<dyn RemoteSync>,
    sink: Arc<dyn SyncFailureSink>,
    mut connectivity: watch::Receiver<ConnectionState>,
    mut trigger_rx: mpsc::Receiver<()>,
    phase_tx: watch::Sender<SyncPhase>,
) {
    loop {
        // One serialized transition per iteration.
        let connected = connectivity.borrow_and_update().is_connected;
        let phase = *phase_tx.borrow();
        let next = if connected {
            phase.on_connected()
        } else {
            phase.on_disconnected()
        };
        let reconnected = next != phase && next == SyncPhase::OnlineIdle;
        if next != phase {
            tracing::info!("sync: {:?} -> {:?}", phase, next);
            phase_tx.send_replace(next);
        }

        // Entering OnlineIdle with work waiting starts a drain immediately;
        // afterwards the loop re-evaluates, picking up anything that changed
        // while the drain ran.
        if reconnected && queue.pending_count().await > 0 {
            drain_once(&queue, &remote, &sink, &connectivity, &phase_tx).await;
            continue;
        }

        tokio::select! {
            changed = connectivity.changed() => {
                if changed.is_err() {
                    break; // monitor dropped
                }
            }
            trigger = trigger_rx.recv() => {
                match trigger {
                    None => break, // coordinator handle dropped
                    Some(()) => {
                        let idle = *phase_tx.borrow() == SyncPhase::OnlineIdle;
                        if idle && queue.pending_count().await > 0 {
                            drain_once(&queue, &remote, &sink, &connectivity, &phase_tx).await;
                        }
                    }
                }
            }
        }
    }
}

async fn drain_once(
    queue: &Arc<OperationQueue>,
    remote: &Arc<dyn RemoteSync>,
    sink: &Arc<dyn SyncFailureSink>,
    connectivity: &watch::Receiver<ConnectionState>,
    phase_tx: &watch::Sender<SyncPhase>,
) {
    let Some(draining) = phase_tx.borrow().drain_started() else {
        return;
    };
    phase_tx.send_replace(draining);

    let result = queue
        .drain(|op| {
            let remote = remote.clone();
            let sink = sink.clone();
            let connectivity = connectivity.clone();
            async move {
                // Connection dropped mid-drain: skip the remaining
                // operations; they stay queued for the next trigger.
                if !connectivity.borrow().is_connected {
                    return Err(SyncError::Offline);
                }
                match remote.push(&op).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        sink.sync_failed(&op, &e);
                        Err(e)
                    }
                }
            }
        })
        .await;

    match result {
        Ok(0) => {}
        Ok(n) => tracing::info!("sync: drained {} operation(s)", n),
        Err(e) => tracing::error!("sync: failed to persist queue after drain: {}", e),
    }

    let after = if connectivity.borrow().is_connected {
        phase_tx.borrow().drain_finished()
    } else {
        SyncPhase::Offline
    };
    phase_tx.send_replace(after);
}
