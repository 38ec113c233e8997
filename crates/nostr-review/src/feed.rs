//! Response feed.
//!
//! Newest-first list of responses received during the session. The feed also
//! records which subscription is allowed to append to it: once that
//! subscription detaches, late deliveries are dropped.

use nostr::JobResponse;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Payment progress of a feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    /// Response carries no invoice
    NotPayable,
    /// Invoice present, not paid yet
    Unpaid,
    /// Payment task running
    Pending,
    /// Wallet confirmed the payment
    Paid { preimage: String },
    /// Wallet rejected or failed the payment
    Failed { error: String },
}

impl PaymentState {
    fn initial(response: &JobResponse) -> Self {
        if response.invoice().is_some() {
            PaymentState::Unpaid
        } else {
            PaymentState::NotPayable
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Paid { .. } | PaymentState::Failed { .. })
    }
}

/// A response together with its payment state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub response: JobResponse,
    pub payment: PaymentState,
}

/// Ordered collection of responses, newest first.
#[derive(Debug, Default)]
pub struct EventFeed {
    entries: VecDeque<FeedEntry>,
    seen: HashSet<String>,
    listening: Option<String>,
    max_entries: Option<usize>,
    dedupe: bool,
}

impl EventFeed {
    pub fn new(max_entries: Option<usize>, dedupe: bool) -> Self {
        Self {
            max_entries,
            dedupe,
            ..Default::default()
        }
    }

    /// Insert a response at the front.
    ///
    /// Returns false when the response was ignored as a duplicate.
    pub fn prepend(&mut self, response: JobResponse) -> bool {
        if self.dedupe && !self.seen.insert(response.id().to_string()) {
            debug!("Ignoring duplicate response {}", response.id());
            return false;
        }

        let payment = PaymentState::initial(&response);
        self.entries.push_front(FeedEntry { response, payment });

        if let Some(max) = self.max_entries {
            while self.entries.len() > max {
                if let Some(evicted) = self.entries.pop_back() {
                    self.seen.remove(evicted.response.id());
                }
            }
        }

        true
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    /// Owned copy of the entries, newest first.
    pub fn snapshot(&self) -> Vec<FeedEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn get(&self, event_id: &str) -> Option<&FeedEntry> {
        self.entries.iter().find(|e| e.response.id() == event_id)
    }

    /// Record a payment state on an entry. Returns false if the entry is gone.
    pub fn set_payment(&mut self, event_id: &str, state: PaymentState) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.response.id() == event_id)
        {
            Some(entry) => {
                entry.payment = state;
                true
            }
            None => false,
        }
    }

    /// Start accepting deliveries from `subscription_id`.
    ///
    /// Entries from earlier requests stay; the feed spans the session.
    pub fn attach(&mut self, subscription_id: &str) {
        self.listening = Some(subscription_id.to_string());
    }

    /// Stop accepting deliveries from `subscription_id`.
    ///
    /// Returns false when that subscription was not the one attached.
    pub fn detach(&mut self, subscription_id: &str) -> bool {
        if self.is_listening_to(subscription_id) {
            self.listening = None;
            true
        } else {
            false
        }
    }

    pub fn is_listening_to(&self, subscription_id: &str) -> bool {
        self.listening.as_deref() == Some(subscription_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
