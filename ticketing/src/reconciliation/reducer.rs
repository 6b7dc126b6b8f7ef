//! Reducer for payment reconciliation.
//!
//! Both entry points converge on the same conditional write. Everything that
//! must happen exactly once per paid reservation (sold-count increment, buyer
//! confirmation) is emitted only after the store reported
//! [`PaidTransition::Transitioned`] to this run.

use super::{
    EntryPath, ReconcileError, ReconciliationAction, ReconciliationEnvironment, ReconciliationPhase,
    ReconciliationState, SideEffectFailure, SideEffectKind,
};
use crate::gateway::GatewayError;
use crate::metrics;
use crate::store::StoreError;
use crate::types::{EventId, PaidTransition, Reference, Reservation};
use smallvec::{SmallVec, smallvec};
use ticketpay_core::{async_effect, effect::Effect, reducer::Reducer};

/// Reducer driving one reconciliation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationReducer;

impl ReconciliationReducer {
    /// Create a new reconciliation reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn fail(
        state: &mut ReconciliationState,
        error: ReconcileError,
        env: &ReconciliationEnvironment,
    ) {
        state.phase = ReconciliationPhase::Failed;
        state.error = Some(error);
        state.finished_at = Some(env.clock().now());
    }

    // ========================================================================
    // Effects
    // ========================================================================

    fn verify_charge(
        env: &ReconciliationEnvironment,
        reference: Reference,
    ) -> Effect<ReconciliationAction> {
        let gateway = env.gateway();
        let timeout = env.gateway_timeout();

        async_effect! {
            match tokio::time::timeout(timeout, gateway.verify_charge(&reference)).await {
                Ok(Ok(charge)) => Some(ReconciliationAction::ChargeVerified { charge }),
                Ok(Err(GatewayError::Unreachable(detail))) => {
                    Some(ReconciliationAction::GatewayUnreachable { detail })
                },
                Ok(Err(error)) if error.is_retryable() => {
                    tracing::warn!(
                        reference = %reference,
                        %error,
                        "Gateway could not verify the charge"
                    );
                    let detail = match error {
                        GatewayError::Rejected { status: Some(status), .. } => {
                            format!("gateway answered {status}")
                        },
                        other => other.to_string(),
                    };
                    Some(ReconciliationAction::GatewayUnreachable { detail })
                },
                Ok(Err(error)) => Some(ReconciliationAction::GatewayRejected {
                    detail: error.to_string(),
                }),
                Err(_) => Some(ReconciliationAction::GatewayUnreachable {
                    detail: format!("no answer within {}ms", timeout.as_millis()),
                }),
            }
        }
    }

    fn mark_paid(
        env: &ReconciliationEnvironment,
        reference: Reference,
    ) -> Effect<ReconciliationAction> {
        let store = env.store();

        async_effect! {
            match store.mark_paid(&reference).await {
                Ok(transition) => Some(ReconciliationAction::MarkedPaid { transition }),
                Err(error) => Some(ReconciliationAction::MarkPaidFailed { error }),
            }
        }
    }

    fn load_ticket(
        env: &ReconciliationEnvironment,
        reference: Reference,
    ) -> Effect<ReconciliationAction> {
        let store = env.store();

        async_effect! {
            match store.get_reservation(&reference).await {
                Ok(ticket) => Some(ReconciliationAction::TicketLoaded {
                    ticket: Some(Box::new(ticket)),
                }),
                Err(error) => {
                    tracing::warn!(
                        reference = %reference,
                        %error,
                        "Paid reservation could not be re-read"
                    );
                    Some(ReconciliationAction::TicketLoaded { ticket: None })
                },
            }
        }
    }

    fn increment_sold_count(
        env: &ReconciliationEnvironment,
        event_id: EventId,
        quantity: u32,
    ) -> Effect<ReconciliationAction> {
        let store = env.store();

        async_effect! {
            let failure = match store.increment_sold_count(&event_id, quantity).await {
                Ok(()) => None,
                Err(error) => {
                    metrics::record_side_effect_failure(SideEffectKind::SoldCount.as_str());
                    tracing::warn!(
                        event_id = %event_id,
                        quantity,
                        %error,
                        "Sold-count increment failed"
                    );
                    Some(error.to_string())
                },
            };
            Some(ReconciliationAction::SideEffectSettled {
                kind: SideEffectKind::SoldCount,
                failure,
            })
        }
    }

    /// Hands the confirmation to a detached task; the run does not wait for
    /// the email provider and feeds nothing back.
    fn send_confirmation(
        env: &ReconciliationEnvironment,
        ticket: Reservation,
    ) -> Effect<ReconciliationAction> {
        let dispatcher = env.dispatcher();

        async_effect! {
            drop(dispatcher.dispatch(ticket));
            None
        }
    }

    /// Event and quantity to add to the sold count: the reservation as
    /// re-read after the write, or the gateway's echo of the purchase intent
    /// when the re-read failed.
    fn sold_count_source(state: &ReconciliationState) -> Option<(EventId, u32)> {
        state
            .ticket
            .as_ref()
            .map(|ticket| (ticket.event_id.clone(), ticket.quantity))
            .or_else(|| {
                state
                    .metadata
                    .as_ref()
                    .filter(|metadata| metadata.quantity > 0)
                    .map(|metadata| (metadata.event_id.clone(), metadata.quantity))
            })
    }

    fn side_effects(
        state: &mut ReconciliationState,
        env: &ReconciliationEnvironment,
    ) -> Vec<Effect<ReconciliationAction>> {
        let mut effects = Vec::with_capacity(2);

        match Self::sold_count_source(state) {
            Some((event_id, quantity)) => {
                effects.push(Self::increment_sold_count(env, event_id, quantity));
                state.pending_side_effects += 1;
            },
            None => {
                metrics::record_side_effect_failure(SideEffectKind::SoldCount.as_str());
                tracing::warn!(
                    reference = ?state.reference,
                    "No event or quantity known; sold count not incremented"
                );
                state.side_effect_failures.push(SideEffectFailure {
                    kind: SideEffectKind::SoldCount,
                    detail: "no event or quantity known".to_string(),
                });
            },
        }

        match state.ticket.clone() {
            Some(ticket) => effects.push(Self::send_confirmation(env, ticket)),
            None => {
                metrics::record_side_effect_failure(SideEffectKind::Confirmation.as_str());
                tracing::warn!(
                    reference = ?state.reference,
                    "Reservation unavailable; confirmation not sent"
                );
                state.side_effect_failures.push(SideEffectFailure {
                    kind: SideEffectKind::Confirmation,
                    detail: "reservation unavailable after payment".to_string(),
                });
            },
        }

        effects
    }
}

impl Reducer for ReconciliationReducer {
    type State = ReconciliationState;
    type Action = ReconciliationAction;
    type Environment = ReconciliationEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action, each short
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ReconciliationAction::VerifyRequested { reference } => {
                if state.phase != ReconciliationPhase::Idle {
                    return SmallVec::new();
                }
                state.path = EntryPath::Verify;
                state.started_at = Some(env.clock().now());

                match reference.as_deref().and_then(Reference::parse) {
                    None => {
                        Self::fail(state, ReconcileError::MissingReference, env);
                        SmallVec::new()
                    },
                    Some(reference) => {
                        state.reference = Some(reference.clone());
                        state.phase = ReconciliationPhase::Verifying;
                        smallvec![Self::verify_charge(env, reference)]
                    },
                }
            },

            ReconciliationAction::NotificationReceived { notification } => {
                if state.phase != ReconciliationPhase::Idle {
                    return SmallVec::new();
                }
                state.path = EntryPath::Webhook;
                state.started_at = Some(env.clock().now());
                state.reference = Some(notification.reference.clone());

                if !notification.is_charge_success() {
                    state.phase = ReconciliationPhase::Ignored;
                    state.finished_at = Some(env.clock().now());
                    return SmallVec::new();
                }

                state.metadata = notification.metadata;
                state.phase = ReconciliationPhase::MarkingPaid;
                smallvec![Self::mark_paid(env, notification.reference)]
            },

            ReconciliationAction::ChargeVerified { charge } => {
                if state.phase != ReconciliationPhase::Verifying {
                    return SmallVec::new();
                }
                if !charge.succeeded() {
                    Self::fail(
                        state,
                        ReconcileError::PaymentNotSuccessful { status: charge.status },
                        env,
                    );
                    return SmallVec::new();
                }
                let Some(reference) = state.reference.clone() else {
                    return SmallVec::new();
                };

                state.metadata = charge.metadata;
                state.phase = ReconciliationPhase::MarkingPaid;
                smallvec![Self::mark_paid(env, reference)]
            },

            ReconciliationAction::GatewayUnreachable { detail } => {
                if state.phase == ReconciliationPhase::Verifying {
                    Self::fail(state, ReconcileError::GatewayUnreachable(detail), env);
                }
                SmallVec::new()
            },

            ReconciliationAction::GatewayRejected { detail } => {
                if state.phase == ReconciliationPhase::Verifying {
                    Self::fail(state, ReconcileError::Gateway(detail), env);
                }
                SmallVec::new()
            },

            ReconciliationAction::MarkedPaid { transition } => {
                if state.phase != ReconciliationPhase::MarkingPaid {
                    return SmallVec::new();
                }
                let Some(reference) = state.reference.clone() else {
                    return SmallVec::new();
                };

                state.transition = Some(transition);
                state.phase = ReconciliationPhase::LoadingTicket;
                smallvec![Self::load_ticket(env, reference)]
            },

            ReconciliationAction::MarkPaidFailed { error } => {
                if state.phase == ReconciliationPhase::MarkingPaid {
                    let error = match error {
                        StoreError::NotFound(_) => ReconcileError::ReservationMissing,
                        other => ReconcileError::TicketUpdateFailed(other.to_string()),
                    };
                    Self::fail(state, error, env);
                }
                SmallVec::new()
            },

            ReconciliationAction::TicketLoaded { ticket } => {
                if state.phase != ReconciliationPhase::LoadingTicket {
                    return SmallVec::new();
                }
                state.ticket = ticket.map(|ticket| *ticket);
                state.phase = ReconciliationPhase::Completed;
                state.finished_at = Some(env.clock().now());

                if state.transition != Some(PaidTransition::Transitioned) {
                    return SmallVec::new();
                }

                let effects = Self::side_effects(state, env);
                if effects.is_empty() {
                    SmallVec::new()
                } else {
                    smallvec![Effect::merge(effects)]
                }
            },

            ReconciliationAction::SideEffectSettled { kind, failure } => {
                state.pending_side_effects = state.pending_side_effects.saturating_sub(1);
                if let Some(detail) = failure {
                    state.side_effect_failures.push(SideEffectFailure { kind, detail });
                }
                SmallVec::new()
            },
        }
    }
}
