//! Relay connection manager.
//!
//! Owns the relay endpoints and the client context built from them, and
//! publishes an aggregate [`ConnectionStatus`] on a watch channel. The
//! manager is the only writer of that status.

use nostr_client::{PoolEvent, RelayConnector, RelayEndpoint, RelayTransport, Signer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Aggregate relay connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error => "Error",
        }
    }
}

/// A live relay pool plus the task watching its lifecycle events.
struct ClientContext {
    transport: Arc<dyn RelayTransport>,
    listener: JoinHandle<()>,
}

impl ClientContext {
    async fn release(self) {
        self.listener.abort();
        self.transport.disconnect().await;
    }
}

/// Builds, replaces and tears down the session's relay pool.
pub struct RelayManager {
    endpoints: Vec<RelayEndpoint>,
    connector: Arc<dyn RelayConnector>,
    timeout: Duration,
    context: Option<ClientContext>,
    status: Arc<watch::Sender<ConnectionStatus>>,
}

impl RelayManager {
    pub fn new(
        endpoints: Vec<RelayEndpoint>,
        connector: Arc<dyn RelayConnector>,
        timeout: Duration,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            endpoints,
            connector,
            timeout,
            context: None,
            status: Arc::new(status),
        }
    }

    /// Build a fresh client context and start connecting it.
    ///
    /// Any previous context is released first. Failure to build the pool is
    /// logged and reported through the status only; the returned transport
    /// is `None` in that case.
    ///
    /// A pool that cannot be built, or whose connect attempt fails before any
    /// relay answered, moves the status to `Error`. This differs from the
    /// plain behaviour of leaving the previous status untouched, so callers
    /// can tell a dead pool from one that is still connecting. A relay that
    /// already reported `Connected` is never downgraded.
    pub async fn connect(
        &mut self,
        signer: Option<Arc<dyn Signer>>,
    ) -> Option<Arc<dyn RelayTransport>> {
        if let Some(previous) = self.context.take() {
            debug!("Releasing previous relay pool");
            previous.release().await;
        }

        self.status.send_replace(ConnectionStatus::Connecting);
        info!("Connecting to {} relays", self.endpoints.len());

        let transport = match self.connector.open(&self.endpoints, signer) {
            Ok(transport) => transport,
            Err(e) => {
                warn!("Failed to create relay pool: {}", e);
                self.status.send_replace(ConnectionStatus::Error);
                return None;
            }
        };

        let listener = spawn_status_listener(transport.notifications(), self.status.clone());

        if let Err(e) = transport.connect(self.timeout).await {
            warn!("Relay pool connect failed: {}", e);
            self.status.send_if_modified(|status| {
                if *status == ConnectionStatus::Connected {
                    false
                } else {
                    *status = ConnectionStatus::Error;
                    true
                }
            });
        }

        self.context = Some(ClientContext {
            transport: transport.clone(),
            listener,
        });

        Some(transport)
    }

    /// Replace the relay set and reconnect.
    pub async fn set_endpoints(
        &mut self,
        endpoints: Vec<RelayEndpoint>,
        signer: Option<Arc<dyn Signer>>,
    ) -> Option<Arc<dyn RelayTransport>> {
        self.endpoints = endpoints;
        self.connect(signer).await
    }

    pub fn endpoints(&self) -> &[RelayEndpoint] {
        &self.endpoints
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// The current relay pool, if one was built.
    pub fn transport(&self) -> Option<Arc<dyn RelayTransport>> {
        self.context.as_ref().map(|c| c.transport.clone())
    }

    /// Release the relay pool.
    pub async fn shutdown(&mut self) {
        if let Some(context) = self.context.take() {
            info!("Disconnecting relay pool");
            context.release().await;
        }
    }
}

fn spawn_status_listener(
    mut notifications: broadcast::Receiver<PoolEvent>,
    status: Arc<watch::Sender<ConnectionStatus>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(PoolEvent::Connected { relay_url }) => {
                    info!("Connected to relay {}", relay_url);
                    status.send_replace(ConnectionStatus::Connected);
                }
                Ok(PoolEvent::Disconnected { relay_url }) => {
                    debug!("Disconnected from relay {}", relay_url);
                }
                Ok(PoolEvent::Notice { relay_url, message }) => {
                    debug!("Notice from {}: {}", relay_url, message);
                }
                Ok(PoolEvent::Error { relay_url, error }) => {
                    warn!("Relay {} error: {}", relay_url, error);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Status listener skipped {} pool events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
