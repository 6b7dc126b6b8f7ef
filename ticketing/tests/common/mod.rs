//! Shared fixtures for the ticketing integration tests.

// Not every test file uses every helper
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use ticketing::config::Config;
use ticketing::gateway::{MockPaymentGateway, sign};
use ticketing::notifications::{ConfirmationMessage, RecordingNotifier};
use ticketing::store::{InMemoryTicketStore, TicketStore};
use ticketing::types::{EventId, EventRecord, Reference, Reservation};
use ticketing::{IssueRequest, IssuedReservation, TicketingApp};
use ticketpay_testing::test_clock;

/// Webhook secret used by every harness
pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Event every fixture buys tickets for
pub const EVENT_ID: &str = "evt_jazz";

/// In-memory application with handles on every adapter.
pub struct Harness {
    pub app: TicketingApp,
    pub store: InMemoryTicketStore,
    pub gateway: MockPaymentGateway,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_gateway(MockPaymentGateway::new())
    }

    pub fn with_gateway(gateway: MockPaymentGateway) -> Self {
        Self::with_adapters(gateway, RecordingNotifier::new())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self::with_adapters(MockPaymentGateway::new(), notifier)
    }

    pub fn with_adapters(gateway: MockPaymentGateway, notifier: RecordingNotifier) -> Self {
        let mut config = Config::default();
        config.gateway.webhook_secret = WEBHOOK_SECRET.to_string();

        let store = InMemoryTicketStore::new();
        let app = TicketingApp::assemble(
            &config,
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
            Arc::new(notifier.clone()),
            Arc::new(test_clock()),
        );

        Self {
            app,
            store,
            gateway,
            notifier,
        }
    }

    /// Register the event so confirmations carry a date.
    pub async fn seed_event(&self) {
        self.store
            .insert_event(EventRecord {
                id: event_id(),
                title: Some("Friday Jazz".to_string()),
                starts_at: None,
                sold_tickets: 0,
            })
            .await;
    }

    /// Issue a reservation for `quantity` tickets at 2500.
    pub async fn issue(&self, quantity: i64) -> IssuedReservation {
        self.app.issuer.issue(purchase(quantity)).await.unwrap()
    }

    pub async fn reservation(&self, reference: &Reference) -> Reservation {
        self.store.get_reservation(reference).await.unwrap()
    }

    /// Confirmations delivered by the detached sends.
    ///
    /// Waits up to a second for `expected` messages, then a little longer so
    /// a duplicate send would still show up.
    pub async fn confirmations(&self, expected: usize) -> Vec<ConfirmationMessage> {
        let deadline = Instant::now() + Duration::from_secs(1);
        while self.notifier.sent().await.len() < expected && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.notifier.sent().await
    }

    /// Sold count of [`EVENT_ID`]; zero when the event was never touched.
    pub async fn sold(&self) -> u64 {
        self.store
            .get_event(&event_id())
            .await
            .map(|event| event.sold_tickets)
            .unwrap_or_default()
    }
}

pub fn event_id() -> EventId {
    EventId::parse(EVENT_ID).unwrap()
}

pub fn purchase(quantity: i64) -> IssueRequest {
    IssueRequest {
        event_id: EVENT_ID.to_string(),
        event_title: "Friday Jazz".to_string(),
        buyer_name: "Ada Obi".to_string(),
        email: "ada@example.com".to_string(),
        phone: Some("+2348000000000".to_string()),
        quantity,
        unit_price: "2500".to_string(),
    }
}

/// Webhook body echoing the purchase metadata, as the gateway sends it.
pub fn webhook_body(event: &str, reference: &Reference, quantity: u32) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "event": event,
        "data": {
            "reference": reference.as_str(),
            "status": "success",
            "amount": 250_000 * u64::from(quantity),
            "metadata": {
                "eventId": EVENT_ID,
                "eventTitle": "Friday Jazz",
                "buyerName": "Ada Obi",
                "quantity": quantity.to_string(),
            }
        }
    }))
    .unwrap()
}

pub fn signature(body: &[u8]) -> String {
    sign(body, WEBHOOK_SECRET)
}
