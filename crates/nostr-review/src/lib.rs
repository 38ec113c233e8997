//! Code review requests over Nostr.
//!
//! A [`ReviewSession`] publishes a local diff as a kind 68005 job request,
//! listens for worker responses that reference it, keeps them in a
//! newest-first [`EventFeed`] and pays the Lightning invoices workers attach.
//!
//! Signing, relay transport and the wallet are external capabilities, passed
//! in through [`Capabilities`]. Operations that need a capability the host
//! does not provide return [`Outcome::Unavailable`] instead of failing.
//!
//! # Example
//!
//! ```rust,no_run
//! use nostr_review::{Capabilities, GitDiffSource, Outcome, ReviewConfig, ReviewSession};
//!
//! async fn review(capabilities: Capabilities) -> anyhow::Result<()> {
//!     nostr_review::init_tracing("info");
//!
//!     let config = ReviewConfig::load()?;
//!     let source = GitDiffSource::new(".", &config.diff);
//!     let mut session = ReviewSession::new(config, capabilities)?;
//!     let _ = session.start().await;
//!
//!     match session.submit_diff(&source).await? {
//!         Outcome::Done(event) => println!("Requested review {}", event.id),
//!         Outcome::Unavailable(missing) => println!("{}", missing.user_message()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod feed;
pub mod identity;
pub mod logging;
pub mod payment;
pub mod publisher;
pub mod relay;
pub mod session;
pub mod subscription;

pub use config::ReviewConfig;
pub use diff::{DiffError, DiffFile, DiffSnapshot, DiffSource, GitDiffSource};
pub use error::{Capability, Outcome, Result, ReviewError};
pub use feed::{EventFeed, FeedEntry, PaymentState};
pub use identity::IdentityProvider;
pub use logging::init_tracing;
pub use payment::{
    PaymentDispatcher, PaymentOutcome, PaymentReceipt, PaymentTask, Wallet, WalletError,
};
pub use publisher::JobPublisher;
pub use relay::{ConnectionStatus, RelayManager};
pub use session::{Capabilities, ReviewSession};
pub use subscription::{ResponseSubscription, SubscriptionManager, SubscriptionState};
