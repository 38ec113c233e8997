//! Nostr protocol types for the code review client.
//!
//! This crate provides:
//! - NIP-01: Event structure, canonical serialization and id hashing
//! - NIP-19: bech32 `npub` encoding for display
//! - NIP-90 style job requests and responses, including the code review
//!   job kind (68005) and the typed `amount` tag carried by responses
//!
//! Signing is not implemented here. Callers hash an [`UnsignedEvent`] with
//! [`get_event_hash`] and attach a signature produced by an external signer
//! via [`UnsignedEvent::into_signed`].

mod nip01;
mod nip19;
mod nip90;

// NIP-01: Basic protocol
pub use nip01::{
    Event, EventTemplate, Nip01Error, UnsignedEvent, get_event_hash, serialize_event,
    unix_now, validate_unsigned_event,
};

// NIP-19: bech32 entities
pub use nip19::{Nip19Error, npub_encode};

// NIP-90: Job requests and responses
pub use nip90::{
    AmountTag, DEFAULT_BID_MSATS, DEFAULT_REVIEW_PREAMBLE, JOB_TYPE_CODE_REVIEW, JobRequest,
    JobResponse, JobStatus, KIND_CODE_REVIEW_REQUEST, Nip90Error,
};
