//! Relay pool capability.
//!
//! A [`RelayTransport`] is a connected pool of relays: it broadcasts
//! published events, fans subscription matches into a single channel, and
//! reports per-relay lifecycle changes as [`PoolEvent`]s. Implementations own
//! the wire protocol; callers only see these operations.

use crate::error::Result;
use crate::message::{Filter, SubscribeOptions};
use crate::relay::RelayEndpoint;
use crate::signer::Signer;
use async_trait::async_trait;
use nostr::Event;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Lifecycle events emitted by a relay pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// A relay connected
    Connected { relay_url: String },
    /// A relay disconnected
    Disconnected { relay_url: String },
    /// Notice from a relay
    Notice { relay_url: String, message: String },
    /// Connection error
    Error { relay_url: String, error: String },
}

/// A connected relay pool.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Start connecting to every relay in the pool.
    ///
    /// `timeout` is a hint for how long to wait before returning; relays
    /// that are still connecting keep trying in the background and report
    /// through [`RelayTransport::notifications`].
    async fn connect(&self, timeout: Duration) -> Result<()>;

    /// Close every relay connection.
    async fn disconnect(&self);

    /// Publish a signed event to the pool.
    async fn publish(&self, event: &Event) -> Result<()>;

    /// Open a subscription; matching events arrive on the returned channel
    /// in delivery order.
    async fn subscribe(
        &self,
        subscription_id: &str,
        filters: Vec<Filter>,
        options: SubscribeOptions,
    ) -> Result<mpsc::Receiver<Event>>;

    /// Close a subscription.
    async fn unsubscribe(&self, subscription_id: &str) -> Result<()>;

    /// Subscribe to pool lifecycle events.
    fn notifications(&self) -> broadcast::Receiver<PoolEvent>;

    /// Relay URLs in the pool.
    fn relay_urls(&self) -> Vec<String>;
}

/// Builds relay pools.
pub trait RelayConnector: Send + Sync {
    /// Construct (but do not connect) a pool for `relays`.
    ///
    /// The signer, when present, is handed to the pool for relay
    /// authentication.
    fn open(
        &self,
        relays: &[RelayEndpoint],
        signer: Option<Arc<dyn Signer>>,
    ) -> Result<Arc<dyn RelayTransport>>;
}
