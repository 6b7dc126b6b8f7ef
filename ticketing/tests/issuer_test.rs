//! Reservation issuing against the in-memory store.
//!
//! Run with: `cargo test -p ticketing --test issuer_test`

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

mod common;

use common::{EVENT_ID, Harness, purchase};
use futures::future::BoxFuture;
use std::sync::Arc;
use ticketing::gateway::{GatewayError, GatewayResult, PaymentGateway};
use ticketing::store::{InMemoryTicketStore, TicketStore};
use ticketing::types::{
    ChargeRequest, InitializedCharge, Money, Reference, ReservationStatus, VerifiedCharge,
};
use ticketing::{IssueError, ReservationIssuer};
use ticketpay_testing::test_clock;

/// Gateway that hands out the same reference every time.
struct FixedReferenceGateway;

impl PaymentGateway for FixedReferenceGateway {
    fn initialize_charge<'a>(
        &'a self,
        _request: &'a ChargeRequest,
    ) -> BoxFuture<'a, GatewayResult<InitializedCharge>> {
        Box::pin(async move {
            Ok(InitializedCharge {
                reference: Reference::parse("ref_fixed").unwrap(),
                redirect_url: "https://checkout.test/ref_fixed".to_string(),
            })
        })
    }

    fn verify_charge<'a>(
        &'a self,
        _reference: &'a Reference,
    ) -> BoxFuture<'a, GatewayResult<VerifiedCharge>> {
        Box::pin(async move { Err(GatewayError::Unreachable("not used".to_string())) })
    }
}

#[tokio::test]
async fn test_issue_stores_pending_reservation_under_gateway_reference() {
    let harness = Harness::new();

    let issued = harness.issue(3).await;

    assert!(issued.redirect_url.ends_with(issued.reference.as_str()));
    assert_eq!(issued.amount, Money::from_minor(750_000));

    let reservation = harness.reservation(&issued.reference).await;
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.event_id.as_str(), EVENT_ID);
    assert_eq!(reservation.quantity, 3);
    assert_eq!(reservation.amount, Money::from_minor(750_000));
    assert_eq!(reservation.email, "ada@example.com");
}

#[tokio::test]
async fn test_charge_request_carries_amount_and_metadata() {
    let harness = Harness::new();

    harness.issue(3).await;

    let charges = harness.gateway.initialized_charges().await;
    assert_eq!(charges.len(), 1);
    let charge = &charges[0];
    assert_eq!(charge.amount.minor(), 750_000);
    assert_eq!(charge.currency, "NGN");
    assert_eq!(charge.email, "ada@example.com");
    assert_eq!(charge.metadata.quantity, 3);
    assert_eq!(charge.metadata.event_id.as_str(), EVENT_ID);
    assert_eq!(charge.metadata.buyer_name, "Ada Obi");
}

#[tokio::test]
async fn test_amount_is_stable_across_issues() {
    let harness = Harness::new();

    let first = harness.issue(3).await;
    let second = harness.issue(3).await;

    assert_ne!(first.reference, second.reference);
    assert_eq!(first.amount, second.amount);
    assert_eq!(harness.store.reservation_count().await, 2);
}

#[tokio::test]
async fn test_validation_error_never_reaches_gateway() {
    let harness = Harness::new();
    let mut request = purchase(3);
    request.email = "nobody".to_string();

    let error = harness.app.issuer.issue(request).await.unwrap_err();

    assert!(matches!(error, IssueError::Validation { field: "email", .. }));
    assert!(harness.gateway.initialized_charges().await.is_empty());
    assert_eq!(harness.store.reservation_count().await, 0);
}

#[tokio::test]
async fn test_gateway_rejection_stores_nothing() {
    let harness = Harness::new();
    let rejection = GatewayError::Rejected {
        status: Some(401),
        message: "Invalid key".to_string(),
    };
    harness.gateway.fail_initialize(Some(rejection.clone())).await;

    let error = harness.app.issuer.issue(purchase(1)).await.unwrap_err();

    assert_eq!(error, IssueError::Gateway(rejection));
    assert_eq!(harness.store.reservation_count().await, 0);
}

#[tokio::test]
async fn test_store_failure_reports_orphaned_reference() {
    let harness = Harness::new();
    harness.store.fail_writes(true);

    let error = harness.app.issuer.issue(purchase(1)).await.unwrap_err();

    match error {
        IssueError::Store { reference, .. } => {
            assert!(reference.as_str().starts_with("mock_ref_"));
        },
        other => unreachable!("expected store error, got {other:?}"),
    }
    assert_eq!(harness.gateway.initialized_charges().await.len(), 1);
}

#[tokio::test]
async fn test_reused_reference_is_a_conflict_and_keeps_original() {
    let store = InMemoryTicketStore::new();
    let issuer = ReservationIssuer::new(
        Arc::new(FixedReferenceGateway),
        Arc::new(store.clone()),
        Arc::new(test_clock()),
        "NGN",
        "http://localhost/callback",
    );

    let first = issuer.issue(purchase(2)).await.unwrap();
    let mut second_request = purchase(5);
    second_request.buyer_name = "Someone Else".to_string();
    let second = issuer.issue(second_request).await;

    assert_eq!(second, Err(IssueError::DuplicateReference(first.reference.clone())));
    let stored = store.get_reservation(&first.reference).await.unwrap();
    assert_eq!(stored.quantity, 2);
    assert_eq!(stored.name, "Ada Obi");
}
