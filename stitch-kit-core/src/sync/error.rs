//! Sync error types.

/// Errors that can occur while talking to the sync server.
#[derive(Debug)]
pub enum SyncError {
    /// Sync is not configured
    NotConfigured,
    /// The device is offline; the operation stays queued
    Offline,
    /// Failed to reach the server
    Connection(String),
    /// Server answered with a non-success status
    Http(String),
    /// Response body could not be decoded
    Decode(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::NotConfigured => {
                write!(f, "Sync not configured. Add server_url to config.")
            }
            SyncError::Offline => {
                write!(f, "Not connected; operation kept for the next sync")
            }
            SyncError::Connection(e) => write!(f, "Connection error: {}", e),
            SyncError::Http(e) => write!(f, "HTTP error: {}", e),
            SyncError::Decode(e) => write!(f, "Failed to decode server response: {}", e),
        }
    }
}

impl std::error::Error for SyncError {}
