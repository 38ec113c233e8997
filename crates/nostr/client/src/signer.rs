//! External signer capability.
//!
//! Keys never enter this process. A signer (browser extension, remote
//! signer, hardware device) hands out its public key and signs events on
//! request, NIP-07 style.

use async_trait::async_trait;
use nostr::UnsignedEvent;
use thiserror::Error;

/// Signer errors.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Signer is not reachable or refused to answer.
    #[error("signer unavailable: {0}")]
    Unavailable(String),
    /// User or policy rejected the signature request.
    #[error("signing rejected: {0}")]
    Rejected(String),
    /// Signer returned something unusable.
    #[error("invalid signer response: {0}")]
    InvalidResponse(String),
}

/// Signing capability.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Hex-encoded public key of the active identity.
    async fn public_key(&self) -> Result<String, SignerError>;

    /// Sign an event, returning the hex-encoded Schnorr signature over its id.
    async fn sign_event(&self, event: &UnsignedEvent) -> Result<String, SignerError>;
}
