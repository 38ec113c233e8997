//! Response subscription manager.
//!
//! At most one subscription is active per session. Opening a new one stops
//! the previous subscription before anything else happens, and a stopped
//! subscription never appends to the feed again: the feed only accepts
//! deliveries from the subscription currently attached to it, and detaching
//! happens under the same lock the pump takes to append.

use crate::feed::EventFeed;
use nostr::{Event, JobResponse};
use nostr_client::{
    ClientError, Filter, RelayTransport, SubscribeOptions, generate_subscription_id,
};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle of a response subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Stopped,
}

/// Open-ended subscription for responses to one job request.
pub struct ResponseSubscription {
    id: String,
    filter: Filter,
    transport: Arc<dyn RelayTransport>,
    feed: Arc<RwLock<EventFeed>>,
    pump: Option<JoinHandle<()>>,
    state: SubscriptionState,
}

impl ResponseSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SubscriptionState::Active
    }

    /// Stop receiving responses. Calling it again does nothing.
    pub async fn stop(&mut self) {
        if self.state == SubscriptionState::Stopped {
            return;
        }
        self.state = SubscriptionState::Stopped;

        self.feed.write().await.detach(&self.id);
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        if let Err(e) = self.transport.unsubscribe(&self.id).await {
            warn!("Failed to close subscription {}: {}", self.id, e);
        }
        debug!("Stopped subscription {}", self.id);
    }
}

impl Drop for ResponseSubscription {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Owns the session's single active response subscription.
pub struct SubscriptionManager {
    active: Option<ResponseSubscription>,
    feed: Arc<RwLock<EventFeed>>,
}

impl SubscriptionManager {
    pub fn new(feed: Arc<RwLock<EventFeed>>) -> Self {
        Self { active: None, feed }
    }

    /// Subscribe to responses referencing `request`, replacing any previous
    /// subscription.
    pub async fn subscribe(
        &mut self,
        transport: Arc<dyn RelayTransport>,
        request: &Event,
    ) -> Result<&ResponseSubscription, ClientError> {
        if let Some(mut previous) = self.active.take() {
            debug!("Replacing subscription {}", previous.id());
            previous.stop().await;
        }

        let id = generate_subscription_id();
        let filter = Filter::referencing(request);
        let options = SubscribeOptions::default()
            .close_on_eose(false)
            .groupable(false);

        self.feed.write().await.attach(&id);

        let receiver = match transport.subscribe(&id, vec![filter.clone()], options).await {
            Ok(receiver) => receiver,
            Err(e) => {
                self.feed.write().await.detach(&id);
                return Err(e);
            }
        };

        info!("Listening for responses to {} on {}", request.id, id);
        let pump = spawn_pump(id.clone(), filter.clone(), receiver, self.feed.clone());

        Ok(&*self.active.insert(ResponseSubscription {
            id,
            filter,
            transport,
            feed: self.feed.clone(),
            pump: Some(pump),
            state: SubscriptionState::Active,
        }))
    }

    /// Stop the active subscription, if any.
    pub async fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.stop().await;
        }
    }

    pub fn active(&self) -> Option<&ResponseSubscription> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.id())
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|s| s.is_active())
    }

    pub fn feed(&self) -> Arc<RwLock<EventFeed>> {
        self.feed.clone()
    }
}

fn spawn_pump(
    subscription_id: String,
    filter: Filter,
    mut receiver: mpsc::Receiver<Event>,
    feed: Arc<RwLock<EventFeed>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            if !filter.matches(&event) {
                debug!("Dropping event {} outside filter", event.id);
                continue;
            }

            let response = JobResponse::from_event(event);
            if response.invoice().is_none() && response.event.tag("amount").is_some() {
                debug!("Response {} has an amount tag without invoice", response.id());
            }

            let mut feed = feed.write().await;
            if !feed.is_listening_to(&subscription_id) {
                break;
            }
            if feed.prepend(response) {
                debug!("Feed now holds {} responses", feed.len());
            }
        }
        debug!("Subscription {} pump finished", subscription_id);
    })
}
