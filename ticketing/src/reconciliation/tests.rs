//! Unit tests for `ReconciliationReducer`.
//!
//! These cover the pure transitions; end-to-end runs through the engine live
//! in `tests/reconciliation_flow_test.rs`.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use super::*;
use crate::gateway::MockPaymentGateway;
use crate::notifications::{ConfirmationDispatcher, RecordingNotifier};
use crate::store::{InMemoryTicketStore, StoreError};
use crate::types::{
    EventId, Money, PaidTransition, PurchaseMetadata, Reference, Reservation, ReservationStatus,
    VerifiedCharge,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use ticketpay_testing::{ReducerTest, assertions, test_clock};

fn test_env() -> ReconciliationEnvironment {
    let store = Arc::new(InMemoryTicketStore::new());
    let dispatcher = ConfirmationDispatcher::new(
        Arc::new(RecordingNotifier::new()),
        store.clone(),
        "NGN",
        Duration::from_secs(1),
    );
    ReconciliationEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(MockPaymentGateway::new()),
        store,
        dispatcher,
        Duration::from_secs(1),
    )
}

fn metadata() -> PurchaseMetadata {
    PurchaseMetadata {
        event_id: EventId::parse("evt_1").unwrap(),
        event_title: "Friday Jazz".to_string(),
        buyer_name: "Ada".to_string(),
        phone: None,
        quantity: 3,
    }
}

fn charge(status: &str) -> VerifiedCharge {
    VerifiedCharge {
        reference: Reference::parse("ref_1").unwrap(),
        status: status.to_string(),
        amount: Some(Money::from_minor(750_000)),
        metadata: Some(metadata()),
    }
}

fn ticket() -> Reservation {
    Reservation {
        reference: Reference::parse("ref_1").unwrap(),
        event_id: EventId::parse("evt_1").unwrap(),
        event_title: "Friday Jazz".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        phone: None,
        quantity: 3,
        amount: Money::from_minor(750_000),
        status: ReservationStatus::Paid,
        created_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

fn verify_requested() -> ReconciliationAction {
    ReconciliationAction::VerifyRequested {
        reference: Some("ref_1".to_string()),
    }
}

fn notification(event: &str, metadata: Option<PurchaseMetadata>) -> ReconciliationAction {
    ReconciliationAction::NotificationReceived {
        notification: GatewayNotification {
            event: event.to_string(),
            reference: Reference::parse("ref_1").unwrap(),
            status: Some("success".to_string()),
            metadata,
        },
    }
}

fn verify_state() -> ReconciliationState {
    ReconciliationState::new(EntryPath::Verify)
}

// ============================================================================
// Verify path
// ============================================================================

#[test]
fn test_verify_without_reference_fails_immediately() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .when_action(ReconciliationAction::VerifyRequested {
            reference: Some("   ".to_string()),
        })
        .then_state(|state| {
            assert!(state.is_failed());
            assert_eq!(state.error, Some(ReconcileError::MissingReference));
            assert!(state.finished_at.is_some());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_verify_asks_gateway() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .when_action(verify_requested())
        .then_state(|state| {
            assert_eq!(state.phase, ReconciliationPhase::Verifying);
            assert_eq!(state.reference.as_ref().unwrap().as_str(), "ref_1");
        })
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assertions::assert_has_future_effect(effects);
        })
        .run();
}

#[test]
fn test_declined_charge_is_not_successful() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![verify_requested()])
        .when_action(ReconciliationAction::ChargeVerified { charge: charge("failed") })
        .then_state(|state| {
            assert_eq!(
                state.error,
                Some(ReconcileError::PaymentNotSuccessful {
                    status: "failed".to_string()
                })
            );
            assert!(state.transition.is_none());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_unreachable_gateway_fails_run() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![verify_requested()])
        .when_action(ReconciliationAction::GatewayUnreachable {
            detail: "timed out".to_string(),
        })
        .then_state(|state| {
            assert_eq!(
                state.error,
                Some(ReconcileError::GatewayUnreachable("timed out".to_string()))
            );
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_gateway_rejection_fails_run() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![verify_requested()])
        .when_action(ReconciliationAction::GatewayRejected {
            detail: "Transaction reference not found".to_string(),
        })
        .then_state(|state| {
            assert!(matches!(state.error, Some(ReconcileError::Gateway(_))));
        })
        .run();
}

#[test]
fn test_successful_charge_marks_paid() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![verify_requested()])
        .when_action(ReconciliationAction::ChargeVerified { charge: charge("success") })
        .then_state(|state| {
            assert_eq!(state.phase, ReconciliationPhase::MarkingPaid);
            assert_eq!(state.metadata.as_ref().unwrap().quantity, 3);
        })
        .then_effects(|effects| assertions::assert_has_future_effect(effects))
        .run();
}

#[test]
fn test_missing_reservation() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![
            verify_requested(),
            ReconciliationAction::ChargeVerified { charge: charge("success") },
        ])
        .when_action(ReconciliationAction::MarkPaidFailed {
            error: StoreError::NotFound("reservation ref_1".to_string()),
        })
        .then_state(|state| assert_eq!(state.error, Some(ReconcileError::ReservationMissing)))
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_store_failure_on_mark_paid() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![
            verify_requested(),
            ReconciliationAction::ChargeVerified { charge: charge("success") },
        ])
        .when_action(ReconciliationAction::MarkPaidFailed {
            error: StoreError::Backend("connection reset".to_string()),
        })
        .then_state(|state| {
            assert!(matches!(
                &state.error,
                Some(ReconcileError::TicketUpdateFailed(detail))
                    if detail.contains("connection reset")
            ));
        })
        .run();
}

// ============================================================================
// Transition gating
// ============================================================================

#[test]
fn test_transition_loads_ticket() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![
            verify_requested(),
            ReconciliationAction::ChargeVerified { charge: charge("success") },
        ])
        .when_action(ReconciliationAction::MarkedPaid {
            transition: PaidTransition::Transitioned,
        })
        .then_state(|state| {
            assert_eq!(state.phase, ReconciliationPhase::LoadingTicket);
            assert!(state.observed_transition());
        })
        .then_effects(|effects| assert_eq!(assertions::future_count(effects), 1))
        .run();
}

#[test]
fn test_observed_transition_fires_both_side_effects() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![
            verify_requested(),
            ReconciliationAction::ChargeVerified { charge: charge("success") },
            ReconciliationAction::MarkedPaid {
                transition: PaidTransition::Transitioned,
            },
        ])
        .when_action(ReconciliationAction::TicketLoaded {
            ticket: Some(Box::new(ticket())),
        })
        .then_state(|state| {
            assert!(state.is_completed());
            assert_eq!(state.pending_side_effects, 1);
            assert!(state.side_effect_failures.is_empty());
        })
        .then_effects(|effects| {
            assertions::assert_effects_count(effects, 1);
            assert_eq!(assertions::future_count(effects), 2);
        })
        .run();
}

#[test]
fn test_already_paid_fires_nothing() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![
            verify_requested(),
            ReconciliationAction::ChargeVerified { charge: charge("success") },
            ReconciliationAction::MarkedPaid {
                transition: PaidTransition::AlreadyPaid,
            },
        ])
        .when_action(ReconciliationAction::TicketLoaded {
            ticket: Some(Box::new(ticket())),
        })
        .then_state(|state| {
            assert!(state.is_completed());
            assert!(!state.observed_transition());
            assert_eq!(state.outcome(), "already_paid");
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_unreadable_ticket_still_completes() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![
            verify_requested(),
            ReconciliationAction::ChargeVerified { charge: charge("success") },
            ReconciliationAction::MarkedPaid {
                transition: PaidTransition::Transitioned,
            },
        ])
        .when_action(ReconciliationAction::TicketLoaded { ticket: None })
        .then_state(|state| {
            assert!(state.is_completed());
            assert!(state.ticket.is_none());
            assert_eq!(state.side_effect_failures.len(), 1);
            assert_eq!(state.side_effect_failures[0].kind, SideEffectKind::Confirmation);
        })
        .then_effects(|effects| assert_eq!(assertions::future_count(effects), 1))
        .run();
}

#[test]
fn test_side_effect_failure_is_recorded_not_fatal() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![
            verify_requested(),
            ReconciliationAction::ChargeVerified { charge: charge("success") },
            ReconciliationAction::MarkedPaid {
                transition: PaidTransition::Transitioned,
            },
            ReconciliationAction::TicketLoaded {
                ticket: Some(Box::new(ticket())),
            },
        ])
        .when_action(ReconciliationAction::SideEffectSettled {
            kind: SideEffectKind::SoldCount,
            failure: Some("injected increment failure".to_string()),
        })
        .then_state(|state| {
            assert!(state.is_completed());
            assert!(state.error.is_none());
            assert_eq!(state.pending_side_effects, 0);
            assert_eq!(state.side_effect_failures[0].kind, SideEffectKind::SoldCount);
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

// ============================================================================
// Webhook path
// ============================================================================

#[test]
fn test_charge_success_goes_straight_to_mark_paid() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(ReconciliationState::new(EntryPath::Webhook))
        .when_action(notification("charge.success", Some(metadata())))
        .then_state(|state| {
            assert_eq!(state.path, EntryPath::Webhook);
            assert_eq!(state.phase, ReconciliationPhase::MarkingPaid);
        })
        .then_effects(|effects| assertions::assert_has_future_effect(effects))
        .run();
}

#[test]
fn test_other_events_are_ignored() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(ReconciliationState::new(EntryPath::Webhook))
        .when_action(notification("transfer.success", None))
        .then_state(|state| {
            assert_eq!(state.phase, ReconciliationPhase::Ignored);
            assert_eq!(state.outcome(), "ignored");
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_webhook_without_metadata_counts_from_ticket() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(ReconciliationState::new(EntryPath::Webhook))
        .given_actions(vec![
            notification("charge.success", None),
            ReconciliationAction::MarkedPaid {
                transition: PaidTransition::Transitioned,
            },
        ])
        .when_action(ReconciliationAction::TicketLoaded {
            ticket: Some(Box::new(ticket())),
        })
        .then_state(|state| {
            assert!(state.metadata.is_none());
            assert!(state.side_effect_failures.is_empty());
        })
        .then_effects(|effects| assert_eq!(assertions::future_count(effects), 2))
        .run();
}

// ============================================================================
// Stale input
// ============================================================================

#[test]
fn test_out_of_phase_actions_are_ignored() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .when_action(ReconciliationAction::MarkedPaid {
            transition: PaidTransition::Transitioned,
        })
        .then_state(|state| {
            assert_eq!(state.phase, ReconciliationPhase::Idle);
            assert!(state.transition.is_none());
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_second_entry_action_is_ignored() {
    ReducerTest::new(ReconciliationReducer::new())
        .with_env(test_env())
        .given_state(verify_state())
        .given_actions(vec![verify_requested()])
        .when_action(notification("charge.success", None))
        .then_state(|state| {
            assert_eq!(state.path, EntryPath::Verify);
            assert_eq!(state.phase, ReconciliationPhase::Verifying);
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}
