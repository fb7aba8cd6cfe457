//! Network reachability observation and transport classification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Interface class a connection runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    None,
    Wifi,
    Cellular,
    Ethernet,
    Unknown,
}

impl Transport {
    /// Picks the transport to report when several interfaces are usable at
    /// once. Priority: wifi > cellular > ethernet > unknown. An empty slice
    /// means no connectivity at all.
    pub fn classify(available: &[Transport]) -> Transport {
        for preferred in [
            Transport::Wifi,
            Transport::Cellular,
            Transport::Ethernet,
            Transport::Unknown,
        ] {
            if available.contains(&preferred) {
                return preferred;
            }
        }
        Transport::None
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::None => write!(f, "none"),
            Transport::Wifi => write!(f, "wifi"),
            Transport::Cellular => write!(f, "cellular"),
            Transport::Ethernet => write!(f, "ethernet"),
            Transport::Unknown => write!(f, "unknown"),
        }
    }
}

/// Snapshot of reachability at one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub transport: Transport,
}

impl ConnectionState {
    pub fn offline() -> Self {
        Self {
            is_connected: false,
            transport: Transport::None,
        }
    }

    pub fn connected(transport: Transport) -> Self {
        Self {
            is_connected: true,
            transport,
        }
    }

    /// Derives the state from the set of currently usable transports.
    pub fn from_transports(available: &[Transport]) -> Self {
        let transport = Transport::classify(available);
        Self {
            is_connected: transport != Transport::None,
            transport,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::offline()
    }
}

/// Source of reachability observations.
///
/// Implementations answer one question: which interface classes currently
/// look usable? An empty answer means offline. A probe that cannot observe
/// anything should keep answering with an empty list rather than erroring,
/// so the monitor degrades to a permanent offline report.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn usable_transports(&self) -> Vec<Transport>;
}

/// Reachability probe that issues a GET against a health endpoint.
///
/// A reachable server proves connectivity but says nothing about the
/// interface, so a success reports [`Transport::Unknown`].
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl NetworkProbe for HttpProbe {
    async fn usable_transports(&self) -> Vec<Transport> {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => vec![Transport::Unknown],
            _ => Vec::new(),
        }
    }
}

/// Polls a [`NetworkProbe`] and publishes de-duplicated state transitions.
///
/// Subscribers receive one notification per detected change, not per polling
/// tick. Before the first observation arrives the published state is
/// offline. The monitor knows nothing about its subscribers; the sync
/// coordinator is just one watch receiver among any number.
pub struct ConnectivityMonitor {
    tx: watch::Sender<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::default());
        Self { tx, task: None }
    }

    /// Begins observation on a background task, polling at `interval`.
    ///
    /// Must be called from within a tokio runtime. Calling `start` again
    /// replaces the previous observation task.
    pub fn start(&mut self, probe: Arc<dyn NetworkProbe>, interval: Duration) {
        self.stop();
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let available = probe.usable_transports().await;
                let next = ConnectionState::from_transports(&available);
                tx.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    if next.is_connected {
                        tracing::info!("connectivity: online via {}", next.transport);
                    } else {
                        tracing::info!("connectivity: offline");
                    }
                    *current = next;
                    true
                });
            }
        }));
    }

    /// Synchronous snapshot of the most recent observation.
    pub fn current_state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
