//! Review session error types.
//!
//! Every operation that crosses into an external capability returns
//! `Result<Outcome<T>>`: `Ok(Outcome::Done)` on success,
//! `Ok(Outcome::Unavailable)` when the capability is simply not there, and
//! `Err` when it was there and failed.

use crate::diff::DiffError;
use crate::payment::WalletError;
use nostr_client::{ClientError, SignerError};
use std::fmt;
use thiserror::Error;

/// Session error type.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("relay error: {0}")]
    Transport(#[from] ClientError),

    #[error("event error: {0}")]
    Event(#[from] nostr::Nip01Error),

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("unknown response: {0}")]
    UnknownResponse(String),
}

/// Session result type.
pub type Result<T> = std::result::Result<T, ReviewError>;

/// An external capability the session depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Key holder; no identity means nothing can be signed
    Signer,
    /// Relay pool built by the connection manager
    ClientContext,
    /// Lightning wallet used to pay invoices
    Wallet,
}

impl Capability {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Capability::Signer => {
                "No Nostr signer is available. Connect a signer to publish review requests."
            }
            Capability::ClientContext => "Not connected to any relay yet.",
            Capability::Wallet => {
                "You need to use a webln enabled browser or extension to zap for these jobs! Download Alby at https://getalby.com !"
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Signer => "signer",
            Capability::ClientContext => "relay client",
            Capability::Wallet => "wallet",
        };
        f.write_str(name)
    }
}

/// Result of an operation that needs an external capability.
#[derive(Debug)]
#[must_use]
pub enum Outcome<T> {
    /// The operation ran.
    Done(T),
    /// The operation was skipped because a capability is missing.
    Unavailable(Capability),
}

impl<T> Outcome<T> {
    /// The value, if the operation ran.
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Unavailable(_) => None,
        }
    }

    /// The missing capability, if the operation was skipped.
    pub fn missing(&self) -> Option<Capability> {
        match self {
            Outcome::Done(_) => None,
            Outcome::Unavailable(capability) => Some(*capability),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }
}
