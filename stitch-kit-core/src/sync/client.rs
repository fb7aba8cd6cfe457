//! HTTP sync client for the stitchkit sync server.
//!
//! Replays queued mutations against the server's operation endpoint and
//! fetches collections for offline caching.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::error::SyncError;
use crate::offline::{OperationKind, PendingOperation};

/// Timeout for the reachability probe.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Abstract remote endpoint the coordinator drains against.
///
/// The production implementation is [`RemoteClient`]; tests substitute
/// their own.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    async fn push(&self, op: &PendingOperation) -> Result<(), SyncError>;
}

/// Wire form of one pending operation. The payload travels base64-encoded
/// so the body stays valid JSON regardless of what the entity serialized to.
#[derive(Debug, Serialize)]
struct PushBody<'a> {
    id: Uuid,
    kind: OperationKind,
    entity_id: Option<&'a str>,
    payload: Option<String>,
    enqueued_at: DateTime<Utc>,
}

/// Client for the stitchkit sync server.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    server_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RemoteClient {
    pub fn new(server_url: String, api_key: String) -> Self {
        Self {
            server_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Full URL of the reachability endpoint, for probes that want to share
    /// this client's URL normalization.
    pub fn health_url(&self) -> String {
        self.build_url("/health")
    }

    /// Pushes one queued mutation to the server.
    pub async fn push_operation(&self, op: &PendingOperation) -> Result<(), SyncError> {
        let url = self.build_url(&format!("/ops/{}", op.entity_type));
        let body = PushBody {
            id: op.id,
            kind: op.kind,
            entity_id: op.entity_id.as_deref(),
            payload: op.payload.as_deref().map(|bytes| BASE64.encode(bytes)),
            enqueued_at: op.enqueued_at,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::Http(format!(
                "Server returned status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Fetches the server's copy of a named collection, for callers that
    /// want to refresh the local cache after reconnecting.
    pub async fn fetch_collection<T: DeserializeOwned>(
        &self,
        entity_type: &str,
    ) -> Result<Vec<T>, SyncError> {
        let url = self.build_url(&format!("/collections/{}", entity_type));

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::Http(format!(
                "Server returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))
    }

    /// Builds a full URL for a given path, defaulting to http:// when the
    /// configured server URL carries no scheme.
    fn build_url(&self, path: &str) -> String {
        let base = if self.server_url.starts_with("http://")
            || self.server_url.starts_with("https://")
        {
            self.server_url.clone()
        } else {
            format!("http://{}", self.server_url)
        };
        format!("{}{}", base.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl RemoteSync for RemoteClient {
    async fn push(&self, op: &PendingOperation) -> Result<(), SyncError> {
        self.push_operation(op).await
    }
}

/// Checks whether the sync server is reachable.
///
/// Best-effort and quiet: any transport error, timeout, or non-success
/// status simply reports unreachable.
pub async fn check_server(server_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(CHECK_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    let base = if server_url.starts_with("http://") || server_url.starts_with("https://") {
        server_url.to_string()
    } else {
        format!("http://{}", server_url)
    };
    let url = format!("{}/health", base.trim_end_matches('/'));

    match client.get(&url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_with_scheme() {
        let client = RemoteClient::new("http://localhost:8080".to_string(), "key".to_string());
        assert_eq!(client.build_url("/health"), "http://localhost:8080/health");

        let client = RemoteClient::new("https://sync.example.com".to_string(), "key".to_string());
        assert_eq!(
            client.build_url("/ops/project"),
            "https://sync.example.com/ops/project"
        );
    }

    #[test]
    fn test_build_url_without_scheme() {
        let client = RemoteClient::new("localhost:8080".to_string(), "key".to_string());
        assert_eq!(client.build_url("/health"), "http://localhost:8080/health");
    }

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let client = RemoteClient::new("http://localhost:8080/".to_string(), "key".to_string());
        assert_eq!(
            client.build_url("/collections/fabric"),
            "http://localhost:8080/collections/fabric"
        );
    }

    #[test]
    fn test_push_body_encodes_payload() {
        let op = PendingOperation::new(OperationKind::Create, "project")
            .with_entity_id("p1")
            .with_payload(vec![1, 2, 3]);
        let body = PushBody {
            id: op.id,
            kind: op.kind,
            entity_id: op.entity_id.as_deref(),
            payload: op.payload.as_deref().map(|b| BASE64.encode(b)),
            enqueued_at: op.enqueued_at,
        };

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"create\""));
        assert!(json.contains(&BASE64.encode([1u8, 2, 3])));
    }

    #[tokio::test]
    async fn test_check_server_unreachable() {
        // Nothing listens on this port.
        assert!(!check_server("http://127.0.0.1:1").await);
    }
}
