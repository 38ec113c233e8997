//! NIP-19: bech32-encoded entities.
//!
//! Only the `npub` form is needed here, to show response authors the way
//! Nostr clients usually do.

use bech32::{Bech32, Hrp};
use thiserror::Error;

/// Human readable part for public keys.
const HRP_NPUB: &str = "npub";

/// Errors that can occur during NIP-19 encoding.
#[derive(Debug, Error)]
pub enum Nip19Error {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid public key length: {0} bytes (expected 32)")]
    InvalidLength(usize),

    #[error("bech32 error: {0}")]
    Bech32(String),
}

/// Encode a hex public key as `npub1...`.
pub fn npub_encode(pubkey_hex: &str) -> Result<String, Nip19Error> {
    let bytes = hex::decode(pubkey_hex).map_err(|e| Nip19Error::InvalidHex(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(Nip19Error::InvalidLength(bytes.len()));
    }

    let hrp = Hrp::parse(HRP_NPUB).map_err(|e| Nip19Error::Bech32(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, &bytes).map_err(|e| Nip19Error::Bech32(e.to_string()))
}
