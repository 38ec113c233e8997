//! NIP-90 style job requests and responses.
//!
//! A customer publishes a job request; workers answer with events that
//! reference the request through an `e` tag. Any response may carry an
//! `amount` tag (`["amount", <millisats>, <bolt11>]`) that the customer can
//! pay.
//!
//! ## Code review jobs
//! - Request kind: 68005
//! - Tags: `["j", "code-review"]`, `["bid", "<millisats>"]`
//! - Content: an instruction preamble followed by a unified diff

use crate::nip01::{Event, EventTemplate};
use crate::nip19::npub_encode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind for code review job requests
pub const KIND_CODE_REVIEW_REQUEST: u32 = 68005;

/// Job type carried in the `j` tag of code review requests
pub const JOB_TYPE_CODE_REVIEW: &str = "code-review";

/// Default bid attached to a code review request (millisats)
pub const DEFAULT_BID_MSATS: u64 = 10_000;

/// Instruction placed in front of the diff
pub const DEFAULT_REVIEW_PREAMBLE: &str =
    "Here is the git diff of my code.  Please provide me with a code review:";

/// Errors that can occur during NIP-90 operations.
#[derive(Debug, Error)]
pub enum Nip90Error {
    #[error("missing required tag: {0}")]
    MissingTag(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),
}

/// Job feedback status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// Service Provider requires payment before continuing
    PaymentRequired,
    /// Service Provider is processing the job
    Processing,
    /// Service Provider was unable to process the job
    Error,
    /// Service Provider successfully processed the job
    Success,
    /// Service Provider partially processed the job
    Partial,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::PaymentRequired => "payment-required",
            JobStatus::Processing => "processing",
            JobStatus::Error => "error",
            JobStatus::Success => "success",
            JobStatus::Partial => "partial",
        }
    }
}

impl FromStr for JobStatus {
    type Err = Nip90Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment-required" => Ok(JobStatus::PaymentRequired),
            "processing" => Ok(JobStatus::Processing),
            "error" => Ok(JobStatus::Error),
            "success" => Ok(JobStatus::Success),
            "partial" => Ok(JobStatus::Partial),
            _ => Err(Nip90Error::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job request event data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Event kind of the request
    pub kind: u32,
    /// Job type (`j` tag)
    pub job_type: String,
    /// Maximum bid in millisats
    pub bid: Option<u64>,
    /// Request payload
    pub content: String,
}

impl JobRequest {
    /// Create a new job request with the given kind and job type.
    pub fn new(kind: u32, job_type: impl Into<String>) -> Self {
        Self {
            kind,
            job_type: job_type.into(),
            bid: None,
            content: String::new(),
        }
    }

    /// Set the maximum bid in millisats.
    pub fn with_bid(mut self, millisats: u64) -> Self {
        self.bid = Some(millisats);
        self
    }

    /// Set the request payload.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Convert to tags for event creation.
    pub fn to_tags(&self) -> Vec<Vec<String>> {
        let mut tags = vec![vec!["j".to_string(), self.job_type.clone()]];

        if let Some(bid) = self.bid {
            tags.push(vec!["bid".to_string(), bid.to_string()]);
        }

        tags
    }

    /// Build an unsigned event template.
    pub fn to_template(&self, created_at: u64) -> EventTemplate {
        EventTemplate {
            created_at,
            kind: self.kind,
            tags: self.to_tags(),
            content: self.content.clone(),
        }
    }
}

/// Typed view of an `amount` tag: `["amount", <millisats>, <bolt11>?]`.
///
/// The two positions are read independently. A worker that writes an odd
/// amount (`""`, `"21000.0"`) still gets its invoice paid; only the sats
/// display is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountTag {
    /// Requested amount in millisats, when it is a plain integer
    pub millisats: Option<u64>,
    /// Lightning invoice to pay, if the worker attached one
    pub bolt11: Option<String>,
}

impl AmountTag {
    /// Parse from tag array.
    pub fn from_tag(tag: &[String]) -> Result<Self, Nip90Error> {
        if tag.first().map(String::as_str) != Some("amount") {
            return Err(Nip90Error::MissingTag("amount".to_string()));
        }
        let millisats = tag.get(1).and_then(|raw| raw.parse::<u64>().ok());
        let bolt11 = tag.get(2).filter(|s| !s.is_empty()).cloned();

        Ok(Self { millisats, bolt11 })
    }

    /// Amount in sats for display (millisats / 1000).
    pub fn sats(&self) -> Option<f64> {
        self.millisats.map(|msats| msats as f64 / 1000.0)
    }
}

/// A response to a job request, read once when it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResponse {
    /// The raw event as delivered by the relay
    pub event: Event,
    /// Request id from the first `e` tag
    pub request_id: Option<String>,
    /// Payment data from the `amount` tag, if present
    pub amount: Option<AmountTag>,
    /// Feedback status, if present
    pub status: Option<JobStatus>,
}

impl JobResponse {
    /// Build a typed response from a delivered event.
    ///
    /// Never rejects the event: a missing or unusable `amount` tag only
    /// means the response is not payable.
    pub fn from_event(event: Event) -> Self {
        let amount = event
            .tag("amount")
            .and_then(|tag| AmountTag::from_tag(tag).ok());
        let status = event
            .tag_value("status")
            .and_then(|s| JobStatus::from_str(s).ok());
        let request_id = event.tag_value("e").map(str::to_string);

        Self {
            event,
            request_id,
            amount,
            status,
        }
    }

    /// Event id of the response.
    pub fn id(&self) -> &str {
        &self.event.id
    }

    /// Invoice to pay, if any.
    pub fn invoice(&self) -> Option<&str> {
        self.amount.as_ref().and_then(|a| a.bolt11.as_deref())
    }

    /// Author as `npub1...`, falling back to the hex key.
    pub fn author_npub(&self) -> String {
        npub_encode(&self.event.pubkey).unwrap_or_else(|_| self.event.pubkey.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event_with_tags(tags: Vec<Vec<&str>>) -> Event {
        Event {
            id: "1".repeat(64),
            pubkey: "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d".to_string(),
            created_at: 1700000000,
            kind: 7000,
            tags: tags
                .into_iter()
                .map(|t| t.into_iter().map(str::to_string).collect())
                .collect(),
            content: "Looks good".to_string(),
            sig: "2".repeat(128),
        }
    }

    #[test]
    fn test_request_tags_and_template() {
        let diff = "diff --git a/src/main.rs b/src/main.rs\n+  \"quoted\"\t\\\n";
        let request = JobRequest::new(KIND_CODE_REVIEW_REQUEST, JOB_TYPE_CODE_REVIEW)
            .with_bid(DEFAULT_BID_MSATS)
            .with_content(diff);

        assert_eq!(
            request.to_tags(),
            vec![
                vec!["j".to_string(), "code-review".to_string()],
                vec!["bid".to_string(), "10000".to_string()],
            ]
        );
        let template = request.to_template(5);
        assert_eq!(template.kind, 68005);
        assert_eq!(template.content, diff);
    }

    #[test]
    fn test_request_without_bid() {
        let request = JobRequest::new(KIND_CODE_REVIEW_REQUEST, "code-review");
        assert_eq!(request.to_tags(), vec![vec!["j", "code-review"]]);
    }

    #[test]
    fn test_amount_tag_parse() {
        let tag: Vec<String> = vec!["amount".into(), "21000".into(), "lnbc1...".into()];
        let amount = AmountTag::from_tag(&tag).unwrap();

        assert_eq!(amount.millisats, Some(21000));
        assert_eq!(amount.bolt11.as_deref(), Some("lnbc1..."));
        assert_eq!(amount.sats(), Some(21.0));
    }

    #[test]
    fn test_amount_tag_without_invoice() {
        let tag: Vec<String> = vec!["amount".into(), "5000".into()];
        let amount = AmountTag::from_tag(&tag).unwrap();
        assert!(amount.bolt11.is_none());
    }

    #[test]
    fn test_amount_tag_odd_millisats_keeps_invoice() {
        for raw in ["", "21000.0", "lots"] {
            let tag: Vec<String> = vec!["amount".into(), raw.into(), "lnbc1".into()];
            let amount = AmountTag::from_tag(&tag).unwrap();

            assert_eq!(amount.millisats, None);
            assert_eq!(amount.sats(), None);
            assert_eq!(amount.bolt11.as_deref(), Some("lnbc1"));
        }

        let tag: Vec<String> = vec!["amount".into()];
        assert_eq!(
            AmountTag::from_tag(&tag).unwrap(),
            AmountTag {
                millisats: None,
                bolt11: None
            }
        );
    }

    #[test]
    fn test_amount_tag_wrong_name() {
        let tag: Vec<String> = vec!["bid".into(), "10".into()];
        assert!(matches!(
            AmountTag::from_tag(&tag),
            Err(Nip90Error::MissingTag(_))
        ));
    }

    #[test]
    fn test_response_with_invoice() {
        let event = event_with_tags(vec![
            vec!["e", "request-id"],
            vec!["status", "payment-required"],
            vec!["amount", "21000", "lnbc1..."],
        ]);
        let response = JobResponse::from_event(event);

        assert_eq!(response.request_id.as_deref(), Some("request-id"));
        assert_eq!(response.status, Some(JobStatus::PaymentRequired));
        assert_eq!(response.invoice(), Some("lnbc1..."));
    }

    #[test]
    fn test_response_without_amount_is_not_payable() {
        let response = JobResponse::from_event(event_with_tags(vec![vec!["e", "req"]]));
        assert!(response.amount.is_none());
        assert!(response.invoice().is_none());
    }

    #[test]
    fn test_response_with_decimal_amount_is_payable() {
        let event = event_with_tags(vec![vec!["e", "req"], vec!["amount", "21000.0", "lnbc2"]]);
        let response = JobResponse::from_event(event);

        assert_eq!(response.invoice(), Some("lnbc2"));
        assert_eq!(response.amount.and_then(|a| a.millisats), None);
    }

    #[test]
    fn test_response_unknown_status_is_ignored() {
        let response =
            JobResponse::from_event(event_with_tags(vec![vec!["status", "quote"]]));
        assert!(response.status.is_none());
    }

    #[test]
    fn test_author_npub() {
        let response = JobResponse::from_event(event_with_tags(vec![]));
        assert_eq!(
            response.author_npub(),
            "npub180cvv07tjdrrgpa0j7j7tmnyl2yr6yr7l8j4s3evf6u64th6gkwsyjh6w6"
        );
    }

    #[test]
    fn test_job_status_roundtrip() {
        for status in [
            JobStatus::PaymentRequired,
            JobStatus::Processing,
            JobStatus::Error,
            JobStatus::Success,
            JobStatus::Partial,
        ] {
            assert_eq!(JobStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(JobStatus::from_str("bogus").is_err());
    }
}
