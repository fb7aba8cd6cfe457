//! Offline resilience layer.
//!
//! Keeps the app usable without a network and converges with the server
//! once one comes back:
//!
//! 1. [`ConnectivityMonitor`] polls a [`NetworkProbe`] and publishes
//!    de-duplicated [`ConnectionState`] transitions on a watch channel.
//! 2. Local mutations enqueue a [`PendingOperation`]; the queue rewrites its
//!    file wholesale on every change, so operations survive restarts.
//! 3. [`SyncCoordinator`] subscribes to the monitor and drains the queue
//!    against a [`crate::sync::RemoteSync`] endpoint whenever the device
//!    comes back online. Failed operations stay queued for the next trigger.
//! 4. [`ContentCache`] keeps the last fetched collections readable offline,
//!    with a metadata table as the source of truth for presence.

mod cache;
mod connectivity;
mod coordinator;
mod queue;

pub use cache::{CacheEntry, CacheError, CacheInfo, ContentCache};
pub use connectivity::{
    ConnectionState, ConnectivityMonitor, HttpProbe, NetworkProbe, Transport,
};
pub use coordinator::{LogSink, SyncCoordinator, SyncFailureSink, SyncPhase};
pub use queue::{OperationKind, OperationQueue, PendingOperation, QueueError};
