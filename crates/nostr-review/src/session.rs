//! Review session.
//!
//! One [`ReviewSession`] owns everything a code-review client holds for its
//! lifetime: the identity, the relay pool, the single active response
//! subscription, the response feed and the payment dispatcher. Replacing any
//! of them releases the previous instance first.

use crate::config::ReviewConfig;
use crate::diff::{DiffFile, DiffSource};
use crate::error::{Capability, Outcome, ReviewError, Result};
use crate::feed::{EventFeed, FeedEntry};
use crate::identity::IdentityProvider;
use crate::payment::{PaymentDispatcher, PaymentOutcome, Wallet};
use crate::publisher::JobPublisher;
use crate::relay::{ConnectionStatus, RelayManager};
use crate::subscription::SubscriptionManager;
use nostr::{Event, JobResponse};
use nostr_client::{RelayConnector, RelayEndpoint, Signer};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{info, warn};

/// External capabilities handed to a session.
///
/// Optional capabilities are feature-detected: `None` means the host does not
/// provide one.
#[derive(Clone)]
pub struct Capabilities {
    pub signer: Option<Arc<dyn Signer>>,
    pub connector: Arc<dyn RelayConnector>,
    pub wallet: Option<Arc<dyn Wallet>>,
}

/// Session-scoped code-review client.
pub struct ReviewSession {
    config: ReviewConfig,
    identity: IdentityProvider,
    relays: RelayManager,
    publisher: JobPublisher,
    subscriptions: SubscriptionManager,
    payments: PaymentDispatcher,
    feed: Arc<RwLock<EventFeed>>,
}

impl ReviewSession {
    /// Create a session. Nothing is contacted until [`ReviewSession::start`].
    pub fn new(config: ReviewConfig, capabilities: Capabilities) -> Result<Self> {
        let endpoints = RelayEndpoint::parse_all(&config.relays.urls)?;
        let feed = Arc::new(RwLock::new(EventFeed::new(
            config.feed.max_entries,
            config.feed.dedupe,
        )));

        Ok(Self {
            identity: IdentityProvider::new(capabilities.signer),
            relays: RelayManager::new(
                endpoints,
                capabilities.connector,
                config.relays.connect_timeout(),
            ),
            publisher: JobPublisher::new(config.job.clone()),
            subscriptions: SubscriptionManager::new(feed.clone()),
            payments: PaymentDispatcher::new(capabilities.wallet),
            feed,
            config,
        })
    }

    /// Resolve the identity and connect to the configured relays.
    pub async fn start(&mut self) -> Outcome<()> {
        self.resolve_identity().await;
        self.connect().await
    }

    /// Ask the signer for the public key if it is not known yet.
    pub async fn resolve_identity(&mut self) -> Option<String> {
        self.identity.resolve().await.map(str::to_string)
    }

    /// Build a fresh relay pool and start connecting.
    pub async fn connect(&mut self) -> Outcome<()> {
        match self.relays.connect(self.identity.signer()).await {
            Some(_) => Outcome::Done(()),
            None => Outcome::Unavailable(Capability::ClientContext),
        }
    }

    /// Switch to a new relay set.
    ///
    /// The URLs are validated before anything is released. On success the
    /// active subscription is stopped, the identity is resolved again and
    /// the session reconnects.
    pub async fn set_relays<S: AsRef<str>>(&mut self, urls: &[S]) -> Result<Outcome<()>> {
        let endpoints = RelayEndpoint::parse_all(urls)?;

        self.subscriptions.stop().await;
        self.identity.reset();
        self.identity.resolve().await;
        self.config.relays.urls = endpoints.iter().map(|e| e.to_string()).collect();

        let outcome = match self
            .relays
            .set_endpoints(endpoints, self.identity.signer())
            .await
        {
            Some(_) => Outcome::Done(()),
            None => Outcome::Unavailable(Capability::ClientContext),
        };
        Ok(outcome)
    }

    /// Sign and publish a review request for `diff`, replacing the active
    /// subscription with one for the new request.
    ///
    /// Without a relay pool or an identity nothing is published and the
    /// missing capability is returned.
    pub async fn submit(&mut self, diff: &str) -> Result<Outcome<Event>> {
        let Some(transport) = self.relays.transport() else {
            warn!("Cannot submit review request: no relay pool");
            return Ok(Outcome::Unavailable(Capability::ClientContext));
        };

        let request = self.publisher.build_request(diff);
        let event = match self.publisher.sign(&self.identity, &request).await? {
            Outcome::Done(event) => event,
            Outcome::Unavailable(capability) => {
                warn!("Cannot submit review request: no {}", capability);
                return Ok(Outcome::Unavailable(capability));
            }
        };

        self.subscriptions
            .subscribe(transport.clone(), &event)
            .await?;

        if let Err(e) = self.publisher.publish(transport.as_ref(), &event).await {
            self.subscriptions.stop().await;
            return Err(e);
        }

        info!("Submitted review request {}", event.id);
        Ok(Outcome::Done(event))
    }

    /// Read the diff from `source` and submit it.
    pub async fn submit_diff(&mut self, source: &dyn DiffSource) -> Result<Outcome<Event>> {
        let snapshot = source.check_diffs().await?;
        self.submit(&snapshot.output).await
    }

    /// Files that would be part of the next request.
    pub async fn preview_diffs(&self, source: &dyn DiffSource) -> Result<Vec<DiffFile>> {
        Ok(source.check_diffs().await?.files)
    }

    /// Stop listening for responses.
    pub async fn stop_subscription(&mut self) {
        self.subscriptions.stop().await;
    }

    /// Id of the active response subscription.
    pub fn active_subscription(&self) -> Option<&str> {
        self.subscriptions.active_id()
    }

    /// Shared handle to the response feed.
    pub fn feed(&self) -> Arc<RwLock<EventFeed>> {
        self.feed.clone()
    }

    /// Current feed entries, newest first.
    pub async fn feed_snapshot(&self) -> Vec<FeedEntry> {
        self.feed.read().await.snapshot()
    }

    /// Pay the invoice attached to a response.
    pub async fn pay(&self, response: &JobResponse) -> Result<Outcome<PaymentOutcome>> {
        Ok(self.payments.pay(response, self.feed.clone()).await)
    }

    /// Pay the feed entry with the given event id.
    pub async fn pay_event(&self, event_id: &str) -> Result<Outcome<PaymentOutcome>> {
        let response = self
            .feed
            .read()
            .await
            .get(event_id)
            .map(|entry| entry.response.clone())
            .ok_or_else(|| ReviewError::UnknownResponse(event_id.to_string()))?;

        self.pay(&response).await
    }

    pub fn public_key(&self) -> Option<&str> {
        self.identity.public_key()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.relays.status()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.relays.watch_status()
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Stop the subscription and release the relay pool.
    pub async fn shutdown(&mut self) {
        self.subscriptions.stop().await;
        self.relays.shutdown().await;
        info!("Review session closed");
    }
}
