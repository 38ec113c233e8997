//! In-memory capabilities for driving a review session in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nostr::{Event, JobResponse, UnsignedEvent};
use nostr_client::{
    ClientError, Filter, PoolEvent, RelayConnector, RelayEndpoint, RelayTransport,
    Result as ClientResult, Signer, SignerError, SubscribeOptions,
};
use nostr_review::{
    Capabilities, EventFeed, PaymentReceipt, ReviewConfig, ReviewSession, Wallet, WalletError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, mpsc};

pub const PUBKEY: &str = "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d";
pub const WORKER: &str = "7e7e9c42a91bfef19fa929e5fda1b72e0ebc1a4c1141673e2794234d86addf4e";

pub fn init_tracing() {
    nostr_review::init_tracing("warn");
}

// Signer

pub struct MockSigner {
    pub fail_public_key: bool,
    pub sign_calls: AtomicUsize,
}

impl MockSigner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_public_key: false,
            sign_calls: AtomicUsize::new(0),
        })
    }

    pub fn locked() -> Arc<Self> {
        Arc::new(Self {
            fail_public_key: true,
            sign_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Signer for MockSigner {
    async fn public_key(&self) -> Result<String, SignerError> {
        if self.fail_public_key {
            Err(SignerError::Rejected("user declined".to_string()))
        } else {
            Ok(PUBKEY.to_string())
        }
    }

    async fn sign_event(&self, _event: &UnsignedEvent) -> Result<String, SignerError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok("ab".repeat(64))
    }
}

// Relay pool

pub struct OpenedSubscription {
    pub id: String,
    pub filters: Vec<Filter>,
    pub options: SubscribeOptions,
    pub sender: mpsc::Sender<Event>,
}

pub struct MockTransport {
    urls: Vec<String>,
    notifications: broadcast::Sender<PoolEvent>,
    pub announce_connected: bool,
    pub fail_connect: AtomicBool,
    pub fail_publish: AtomicBool,
    pub published: Mutex<Vec<Event>>,
    pub subscriptions: Mutex<Vec<OpenedSubscription>>,
    pub unsubscribed: Mutex<Vec<String>>,
    pub disconnected: AtomicBool,
}

impl MockTransport {
    fn new(urls: Vec<String>, announce_connected: bool) -> Self {
        let (notifications, _) = broadcast::channel(16);
        Self {
            urls,
            notifications,
            announce_connected,
            fail_connect: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            unsubscribed: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
        }
    }

    pub fn published(&self) -> Vec<Event> {
        self.published.lock().unwrap().clone()
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().unwrap().clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// Sender for the `index`-th subscription opened on this transport.
    pub fn sender(&self, index: usize) -> mpsc::Sender<Event> {
        self.subscriptions.lock().unwrap()[index].sender.clone()
    }

    pub fn emit(&self, event: PoolEvent) {
        let _ = self.notifications.send(event);
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelayTransport for MockTransport {
    async fn connect(&self, _timeout: Duration) -> ClientResult<()> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout("no relay answered".to_string()));
        }
        if self.announce_connected {
            for url in &self.urls {
                self.emit(PoolEvent::Connected {
                    relay_url: url.clone(),
                });
            }
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    async fn publish(&self, event: &Event) -> ClientResult<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(ClientError::PublishFailed("rejected by all relays".to_string()));
        }
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn subscribe(
        &self,
        subscription_id: &str,
        filters: Vec<Filter>,
        options: SubscribeOptions,
    ) -> ClientResult<mpsc::Receiver<Event>> {
        let (sender, receiver) = mpsc::channel(64);
        self.subscriptions.lock().unwrap().push(OpenedSubscription {
            id: subscription_id.to_string(),
            filters,
            options,
            sender,
        });
        Ok(receiver)
    }

    async fn unsubscribe(&self, subscription_id: &str) -> ClientResult<()> {
        self.unsubscribed
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
        Ok(())
    }

    fn notifications(&self) -> broadcast::Receiver<PoolEvent> {
        self.notifications.subscribe()
    }

    fn relay_urls(&self) -> Vec<String> {
        self.urls.clone()
    }
}

pub struct MockConnector {
    pub fail_open: AtomicBool,
    pub fail_connect: AtomicBool,
    pub announce_connected: bool,
    pub transports: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Self::with_announce(true)
    }

    /// Connector whose pools never report a connected relay.
    pub fn silent() -> Arc<Self> {
        Self::with_announce(false)
    }

    fn with_announce(announce_connected: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_open: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            announce_connected,
            transports: Mutex::new(Vec::new()),
        })
    }

    pub fn opened(&self) -> usize {
        self.transports.lock().unwrap().len()
    }

    /// Most recently built pool.
    pub fn transport(&self) -> Arc<MockTransport> {
        self.transports
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no relay pool opened")
    }

    pub fn transport_at(&self, index: usize) -> Arc<MockTransport> {
        self.transports.lock().unwrap()[index].clone()
    }
}

impl RelayConnector for MockConnector {
    fn open(
        &self,
        relays: &[RelayEndpoint],
        _signer: Option<Arc<dyn Signer>>,
    ) -> ClientResult<Arc<dyn RelayTransport>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("pool unavailable".to_string()));
        }

        let transport = Arc::new(MockTransport::new(
            relays.iter().map(|r| r.to_string()).collect(),
            self.announce_connected,
        ));
        transport
            .fail_connect
            .store(self.fail_connect.load(Ordering::SeqCst), Ordering::SeqCst);
        self.transports.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}

// Wallet

#[derive(Default)]
pub struct MockWallet {
    pub decline: bool,
    pub enables: AtomicUsize,
    pub invoices: Mutex<Vec<String>>,
}

impl MockWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn declining() -> Arc<Self> {
        Arc::new(Self {
            decline: true,
            ..Default::default()
        })
    }

    pub fn invoices(&self) -> Vec<String> {
        self.invoices.lock().unwrap().clone()
    }

    pub fn enable_count(&self) -> usize {
        self.enables.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn enable(&self) -> Result<(), WalletError> {
        self.enables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_payment(&self, invoice: &str) -> Result<PaymentReceipt, WalletError> {
        self.invoices.lock().unwrap().push(invoice.to_string());
        if self.decline {
            Err(WalletError::PaymentFailed("insufficient balance".to_string()))
        } else {
            Ok(PaymentReceipt {
                preimage: "0123456789abcdef".to_string(),
            })
        }
    }
}

// Sessions and events

pub fn test_config() -> ReviewConfig {
    let mut config = ReviewConfig::default();
    config.relays.urls = vec![
        "wss://relay.one.example".to_string(),
        "wss://relay.two.example".to_string(),
    ];
    config.relays.connect_timeout_ms = 50;
    config
}

pub fn capabilities(
    signer: Option<Arc<MockSigner>>,
    connector: &Arc<MockConnector>,
    wallet: Option<Arc<MockWallet>>,
) -> Capabilities {
    Capabilities {
        signer: signer.map(|s| s as Arc<dyn Signer>),
        connector: connector.clone(),
        wallet: wallet.map(|w| w as Arc<dyn Wallet>),
    }
}

/// Started session with a signer, a connecting pool and an optional wallet.
pub async fn started_session(
    connector: &Arc<MockConnector>,
    wallet: Option<Arc<MockWallet>>,
) -> ReviewSession {
    init_tracing();
    let mut session = ReviewSession::new(
        test_config(),
        capabilities(Some(MockSigner::new()), connector, wallet),
    )
    .unwrap();
    assert!(session.start().await.is_done());
    session
}

/// Worker response referencing `request_id`.
pub fn response_event(id_char: char, request_id: &str, amount: Option<(&str, &str)>) -> Event {
    let mut tags = vec![
        vec!["e".to_string(), request_id.to_string()],
        vec!["p".to_string(), PUBKEY.to_string()],
    ];
    if let Some((millisats, invoice)) = amount {
        tags.push(vec![
            "amount".to_string(),
            millisats.to_string(),
            invoice.to_string(),
        ]);
    }

    Event {
        id: id_char.to_string().repeat(64),
        pubkey: WORKER.to_string(),
        created_at: 1_700_000_100,
        kind: 68006,
        tags,
        content: format!("review {}", id_char),
        sig: "cd".repeat(64),
    }
}

pub fn response(id_char: char, request_id: &str, amount: Option<(&str, &str)>) -> JobResponse {
    JobResponse::from_event(response_event(id_char, request_id, amount))
}

/// Wait until the feed holds at least `len` entries.
pub async fn wait_for_feed(feed: &Arc<RwLock<EventFeed>>, len: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while feed.read().await.len() < len {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("feed did not fill in time");
}

/// Give spawned tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

/// Ids of feed entries, newest first, shortened to their first character.
pub async fn feed_ids(feed: &Arc<RwLock<EventFeed>>) -> Vec<String> {
    feed.read()
        .await
        .entries()
        .map(|e| e.response.id()[..1].to_string())
        .collect()
}
