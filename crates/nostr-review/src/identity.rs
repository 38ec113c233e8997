//! Identity provider.
//!
//! Holds the public key of the active signer once it has been resolved.

use nostr_client::Signer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves and caches the session identity.
pub struct IdentityProvider {
    signer: Option<Arc<dyn Signer>>,
    public_key: Option<String>,
}

impl IdentityProvider {
    pub fn new(signer: Option<Arc<dyn Signer>>) -> Self {
        Self {
            signer,
            public_key: None,
        }
    }

    /// Ask the signer for its public key if none is known yet.
    ///
    /// A missing or failing signer leaves the identity unset; the failure is
    /// logged and never returned.
    pub async fn resolve(&mut self) -> Option<&str> {
        if self.public_key.is_none() {
            match &self.signer {
                None => debug!("No signer available, identity stays unset"),
                Some(signer) => match signer.public_key().await {
                    Ok(public_key) => {
                        info!("Resolved identity {}", public_key);
                        self.public_key = Some(public_key);
                    }
                    Err(e) => warn!("Failed to resolve identity: {}", e),
                },
            }
        }

        self.public_key.as_deref()
    }

    /// Hex public key, if resolved.
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.public_key.is_some()
    }

    /// Forget the resolved key so the next `resolve` asks the signer again.
    pub fn reset(&mut self) {
        self.public_key = None;
    }

    pub fn signer(&self) -> Option<Arc<dyn Signer>> {
        self.signer.clone()
    }
}
