//! Payment dispatcher.
//!
//! Pays the invoice a worker attached to its response through an external
//! Lightning wallet. Each payment runs as its own task; the terminal state is
//! written back to the feed entry and returned through [`PaymentTask::wait`].

use crate::error::{Capability, Outcome};
use crate::feed::{EventFeed, PaymentState};
use async_trait::async_trait;
use nostr::JobResponse;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Wallet errors.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// Payment failed.
    #[error("payment failed: {0}")]
    PaymentFailed(String),
}

/// Proof of a settled payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Payment preimage (hex).
    pub preimage: String,
}

/// Lightning wallet capability (WebLN style).
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Ask the user or provider for permission to pay.
    async fn enable(&self) -> Result<(), WalletError>;

    /// Pay a BOLT11 invoice.
    async fn send_payment(&self, invoice: &str) -> Result<PaymentReceipt, WalletError>;
}

/// What `pay` did with a response.
#[derive(Debug)]
pub enum PaymentOutcome {
    /// The response carries no invoice; the wallet was not touched.
    NotPayable,
    /// A payment task was started.
    Dispatched(PaymentTask),
}

/// Handle to a running payment.
#[derive(Debug)]
pub struct PaymentTask {
    event_id: String,
    handle: JoinHandle<PaymentState>,
}

impl PaymentTask {
    /// Id of the response being paid.
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the terminal state (`Paid` or `Failed`).
    pub async fn wait(self) -> PaymentState {
        match self.handle.await {
            Ok(state) => state,
            Err(e) => PaymentState::Failed {
                error: format!("payment task ended: {}", e),
            },
        }
    }
}

/// Forwards response invoices to the wallet.
#[derive(Clone)]
pub struct PaymentDispatcher {
    wallet: Option<Arc<dyn Wallet>>,
    enabled: Arc<OnceCell<()>>,
}

impl PaymentDispatcher {
    pub fn new(wallet: Option<Arc<dyn Wallet>>) -> Self {
        Self {
            wallet,
            enabled: Arc::new(OnceCell::new()),
        }
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    /// Pay the invoice attached to `response`.
    ///
    /// The wallet is enabled at most once per dispatcher; a failed enable is
    /// retried on the next payment.
    pub async fn pay(
        &self,
        response: &JobResponse,
        feed: Arc<RwLock<EventFeed>>,
    ) -> Outcome<PaymentOutcome> {
        let Some(wallet) = self.wallet.clone() else {
            warn!("{}", Capability::Wallet.user_message());
            return Outcome::Unavailable(Capability::Wallet);
        };

        let Some(invoice) = response.invoice().map(str::to_string) else {
            debug!("Response {} has no invoice", response.id());
            return Outcome::Done(PaymentOutcome::NotPayable);
        };

        let event_id = response.id().to_string();
        feed.write()
            .await
            .set_payment(&event_id, PaymentState::Pending);
        info!("Paying invoice for response {}", event_id);

        let enabled = self.enabled.clone();
        let task_event_id = event_id.clone();
        let handle = tokio::spawn(async move {
            let state = match send(wallet.as_ref(), &enabled, &invoice).await {
                Ok(receipt) => {
                    info!("Paid response {}", task_event_id);
                    PaymentState::Paid {
                        preimage: receipt.preimage,
                    }
                }
                Err(e) => {
                    warn!("Payment for response {} failed: {}", task_event_id, e);
                    PaymentState::Failed {
                        error: e.to_string(),
                    }
                }
            };

            feed.write()
                .await
                .set_payment(&task_event_id, state.clone());
            state
        });

        Outcome::Done(PaymentOutcome::Dispatched(PaymentTask { event_id, handle }))
    }
}

async fn send(
    wallet: &dyn Wallet,
    enabled: &OnceCell<()>,
    invoice: &str,
) -> Result<PaymentReceipt, WalletError> {
    enabled.get_or_try_init(|| wallet.enable()).await?;
    wallet.send_payment(invoice).await
}
