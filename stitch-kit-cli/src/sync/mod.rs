//! Wiring between CLI commands and the offline sync layer.

mod auto_sync;

pub use auto_sync::try_auto_sync;

use std::sync::Arc;

use stitch_kit_core::offline::{
    ContentCache, OperationKind, OperationQueue, PendingOperation, QueueError,
};
use stitch_kit_core::sync::{RemoteClient, SyncError};
use uuid::Uuid;

use crate::config::Config;

/// Queue, cache, and remote client for one command invocation.
///
/// The queue and cache open against the configured data directory; the
/// remote client exists only when sync is configured.
pub struct SyncContext {
    pub queue: Arc<OperationQueue>,
    pub cache: Arc<ContentCache>,
    remote: Option<RemoteClient>,
}

impl SyncContext {
    pub fn open(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let queue = Arc::new(OperationQueue::open(config.queue_path())?);
        let cache = Arc::new(ContentCache::open(config.cache_dir())?);
        let remote = match (&config.sync.server_url, &config.sync.api_key) {
            (Some(url), Some(key)) => Some(RemoteClient::new(url.clone(), key.clone())),
            _ => None,
        };
        Ok(Self {
            queue,
            cache,
            remote,
        })
    }

    pub fn remote(&self) -> Result<&RemoteClient, SyncError> {
        self.remote.as_ref().ok_or(SyncError::NotConfigured)
    }

    /// Records a local mutation for later replay. Used by every write
    /// command regardless of connectivity, so online and offline writes
    /// share one code path.
    pub async fn record_mutation(
        &self,
        kind: OperationKind,
        entity_type: &str,
        entity_id: Uuid,
        payload: Option<Vec<u8>>,
    ) -> Result<(), QueueError> {
        let mut op =
            PendingOperation::new(kind, entity_type).with_entity_id(entity_id.to_string());
        if let Some(payload) = payload {
            op = op.with_payload(payload);
        }
        self.queue.enqueue(op).await
    }

    /// Drains the queue against the configured server. Per-operation
    /// failures keep their operations queued; the return value is the
    /// number retired.
    pub async fn drain_remote(&self) -> Result<usize, Box<dyn std::error::Error>> {
        let remote = self.remote()?;
        let retired = self
            .queue
            .drain(|op| async move {
                match remote.push_operation(&op).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        tracing::warn!(
                            "sync: {} {} failed, keeping queued: {}",
                            op.kind,
                            op.entity_type,
                            e
                        );
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(retired)
    }
}
