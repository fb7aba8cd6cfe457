//! Stitch Kit Core Library
//!
//! Shared models and offline sync logic for stitchkit applications.

pub mod models;
pub mod offline;
pub mod sync;

pub use models::{Fabric, Pattern, Project, ProjectStatus};
pub use offline::{
    CacheEntry, CacheError, CacheInfo, ConnectionState, ConnectivityMonitor, ContentCache,
    HttpProbe, LogSink, NetworkProbe, OperationKind, OperationQueue, PendingOperation, QueueError,
    SyncCoordinator, SyncFailureSink, SyncPhase, Transport,
};
pub use sync::{check_server, RemoteClient, RemoteSync, SyncError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
