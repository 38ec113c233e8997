//! Relay and signer capabilities for Nostr clients.
//!
//! This crate does not speak the relay wire protocol itself. It defines the
//! seams a client is written against:
//! - [`RelayTransport`]: a connected relay pool (publish, subscribe, lifecycle)
//! - [`RelayConnector`]: builds a transport for a set of relay endpoints
//! - [`Signer`]: an external key holder (NIP-07 style)
//! - [`Filter`] and [`SubscribeOptions`] for subscription requests
//!
//! # Example
//!
//! ```rust,no_run
//! use nostr_client::{Filter, RelayTransport, SubscribeOptions};
//! use std::sync::Arc;
//!
//! async fn watch_replies(transport: Arc<dyn RelayTransport>, request: &nostr::Event) {
//!     let filter = Filter::referencing(request);
//!     let options = SubscribeOptions::default().close_on_eose(false).groupable(false);
//!
//!     let mut events = transport
//!         .subscribe("replies", vec![filter], options)
//!         .await
//!         .unwrap();
//!
//!     while let Some(event) = events.recv().await {
//!         println!("Received event: {}", event.id);
//!     }
//! }
//! ```

mod error;
mod message;
mod pool;
mod relay;
mod signer;
mod subscription;

pub use error::{ClientError, Result};
pub use message::{Filter, SubscribeOptions};
pub use pool::{PoolEvent, RelayConnector, RelayTransport};
pub use relay::RelayEndpoint;
pub use signer::{Signer, SignerError};
pub use subscription::generate_subscription_id;

/// Default relays.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
    "wss://nostr.wine",
];
