//! Job request publisher.

use crate::config::JobConfig;
use crate::error::{Capability, Outcome, Result};
use crate::identity::IdentityProvider;
use nostr::{Event, JobRequest, KIND_CODE_REVIEW_REQUEST, UnsignedEvent, unix_now};
use nostr_client::RelayTransport;
use tracing::{debug, info};

/// Builds, signs and publishes code-review job requests.
#[derive(Debug, Clone)]
pub struct JobPublisher {
    job: JobConfig,
}

impl JobPublisher {
    pub fn new(job: JobConfig) -> Self {
        Self { job }
    }

    /// Request for `diff`: configured job type and bid, preamble then diff.
    pub fn build_request(&self, diff: &str) -> JobRequest {
        JobRequest::new(KIND_CODE_REVIEW_REQUEST, self.job.job_type.clone())
            .with_bid(self.job.bid_msats)
            .with_content(format!("{}\n\n{}", self.job.preamble, diff))
    }

    /// Hash and sign a request as the resolved identity.
    ///
    /// Returns `Unavailable(Signer)` when no identity has been resolved.
    pub async fn sign(
        &self,
        identity: &IdentityProvider,
        request: &JobRequest,
    ) -> Result<Outcome<Event>> {
        let (Some(signer), Some(pubkey)) = (identity.signer(), identity.public_key()) else {
            return Ok(Outcome::Unavailable(Capability::Signer));
        };

        let unsigned = UnsignedEvent::from_template(request.to_template(unix_now()), pubkey);
        let sig = signer.sign_event(&unsigned).await?;
        let event = unsigned.into_signed(sig)?;

        debug!("Signed job request {}", event.id);
        Ok(Outcome::Done(event))
    }

    /// Broadcast a signed request.
    pub async fn publish(&self, transport: &dyn RelayTransport, event: &Event) -> Result<()> {
        transport.publish(event).await?;
        info!(
            "Published job request {} to {} relays",
            event.id,
            transport.relay_urls().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReviewError;
    use async_trait::async_trait;
    use nostr::{DEFAULT_REVIEW_PREAMBLE, get_event_hash};
    use nostr_client::{Signer, SignerError};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct FixedSigner {
        sig: String,
    }

    #[async_trait]
    impl Signer for FixedSigner {
        async fn public_key(&self) -> std::result::Result<String, SignerError> {
            Ok("c".repeat(64))
        }

        async fn sign_event(
            &self,
            _event: &UnsignedEvent,
        ) -> std::result::Result<String, SignerError> {
            Ok(self.sig.clone())
        }
    }

    #[test]
    fn test_build_request() {
        let publisher = JobPublisher::new(JobConfig::default());
        let request = publisher.build_request("diff --git a/x b/x\n+hello");

        assert_eq!(request.kind, 68005);
        assert_eq!(
            request.to_tags(),
            vec![
                vec!["j".to_string(), "code-review".to_string()],
                vec!["bid".to_string(), "10000".to_string()],
            ]
        );
        assert_eq!(
            request.content,
            format!("{}\n\ndiff --git a/x b/x\n+hello", DEFAULT_REVIEW_PREAMBLE)
        );
    }

    #[test]
    fn test_build_request_uses_config() {
        let publisher = JobPublisher::new(JobConfig {
            job_type: "security-review".to_string(),
            bid_msats: 42_000,
            preamble: "Review:".to_string(),
        });
        let request = publisher.build_request("D");

        assert_eq!(request.job_type, "security-review");
        assert_eq!(request.bid, Some(42_000));
        assert_eq!(request.content, "Review:\n\nD");
    }

    #[tokio::test]
    async fn test_sign_without_identity() {
        let publisher = JobPublisher::new(JobConfig::default());
        let identity = IdentityProvider::new(None);
        let outcome = publisher
            .sign(&identity, &publisher.build_request("D"))
            .await
            .unwrap();

        assert_eq!(outcome.missing(), Some(Capability::Signer));
    }

    #[tokio::test]
    async fn test_sign_computes_id() {
        let publisher = JobPublisher::new(JobConfig::default());
        let mut identity = IdentityProvider::new(Some(Arc::new(FixedSigner {
            sig: "d".repeat(128),
        })));
        identity.resolve().await;

        let event = publisher
            .sign(&identity, &publisher.build_request("D"))
            .await
            .unwrap()
            .done()
            .unwrap();

        let unsigned = UnsignedEvent {
            pubkey: event.pubkey.clone(),
            created_at: event.created_at,
            kind: event.kind,
            tags: event.tags.clone(),
            content: event.content.clone(),
        };
        assert_eq!(event.id, get_event_hash(&unsigned).unwrap());
        assert_eq!(event.pubkey, "c".repeat(64));
        assert_eq!(event.sig, "d".repeat(128));
    }

    #[tokio::test]
    async fn test_bad_signature_is_error() {
        let publisher = JobPublisher::new(JobConfig::default());
        let mut identity = IdentityProvider::new(Some(Arc::new(FixedSigner {
            sig: "nope".to_string(),
        })));
        identity.resolve().await;

        let result = publisher.sign(&identity, &publisher.build_request("D")).await;
        assert!(matches!(result, Err(ReviewError::Event(_))));
    }
}
