//! Entry points of the reconciliation engine.
//!
//! Each call builds a request-scoped [`Store`] over [`ReconciliationReducer`],
//! sends the entry action and reads the settled state. No state is shared
//! between calls; concurrent calls for one reference are serialized only by
//! the ticket store's conditional write.

use super::{
    EntryPath, GatewayNotification, ReconcileError, ReconciliationAction, ReconciliationEnvironment,
    ReconciliationPhase, ReconciliationReducer, ReconciliationState, WebhookError,
};
use crate::gateway::validate_signature;
use crate::metrics;
use crate::types::{PaidTransition, Reference, Reservation};
use serde::Serialize;
use ticketpay_runtime::Store;

/// Store type for one reconciliation run
pub type ReconciliationStore = Store<
    ReconciliationState,
    ReconciliationAction,
    ReconciliationEnvironment,
    ReconciliationReducer,
>;

/// Successful verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedTicket {
    /// Reference that is now paid
    pub reference: Reference,
    /// Whether this call performed the transition
    #[serde(skip)]
    pub transition: PaidTransition,
    /// Reservation after the write; `None` if it could not be re-read
    pub ticket: Option<Reservation>,
}

/// What a webhook delivery led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// This delivery moved the reservation to `paid`
    Transitioned,
    /// Already `paid`; nothing changed
    AlreadyPaid,
    /// Not a payment confirmation
    Ignored,
    /// Processing failed after the notification was accepted
    Failed(ReconcileError),
}

/// Acknowledgement for an accepted webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationReceipt {
    /// Reference the notification was about
    pub reference: Reference,
    /// Event type
    pub event: String,
    /// What happened
    pub outcome: NotificationOutcome,
}

/// Verify and webhook entry points.
#[derive(Clone)]
pub struct ReconciliationEngine {
    environment: ReconciliationEnvironment,
    webhook_secret: String,
}

impl ReconciliationEngine {
    /// Create a new engine.
    #[must_use]
    pub fn new(environment: ReconciliationEnvironment, webhook_secret: impl Into<String>) -> Self {
        Self {
            environment,
            webhook_secret: webhook_secret.into(),
        }
    }

    fn store(&self, path: EntryPath) -> ReconciliationStore {
        Store::new(
            ReconciliationState::new(path),
            ReconciliationReducer::new(),
            self.environment.clone(),
        )
    }

    /// Buyer-initiated verification of a charge.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the reservation could not be brought to
    /// `paid`. Sold-count and email failures are never returned.
    #[tracing::instrument(skip(self), fields(path = "verify"))]
    pub async fn verify(&self, reference: Option<&str>) -> Result<VerifiedTicket, ReconcileError> {
        let store = self.store(EntryPath::Verify);
        store
            .send(ReconciliationAction::VerifyRequested {
                reference: reference.map(str::to_string),
            })
            .await;
        let state = store.state(ReconciliationState::clone).await;
        Self::record(&state);

        if let Some(error) = state.error {
            return Err(error);
        }
        match (state.phase, state.reference, state.transition) {
            (ReconciliationPhase::Completed, Some(reference), Some(transition)) => {
                Ok(VerifiedTicket {
                    reference,
                    transition,
                    ticket: state.ticket,
                })
            },
            _ => Err(ReconcileError::TicketUpdateFailed(
                "reconciliation did not complete".to_string(),
            )),
        }
    }

    /// Gateway-initiated notification.
    ///
    /// Once the signature and body are accepted the notification is always
    /// acknowledged; downstream failures are logged and reported in the
    /// receipt.
    ///
    /// # Errors
    ///
    /// [`WebhookError`] if the signature does not match or the body cannot be
    /// parsed. Nothing has been changed in either case.
    #[tracing::instrument(skip_all, fields(path = "webhook"))]
    pub async fn handle_notification(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<NotificationReceipt, WebhookError> {
        if !validate_signature(raw_body, signature, &self.webhook_secret) {
            metrics::record_webhook_rejected("signature");
            tracing::warn!(
                signature_present = signature.is_some(),
                "Rejected webhook with invalid signature"
            );
            return Err(WebhookError::InvalidSignature);
        }

        let notification = GatewayNotification::parse(raw_body).inspect_err(|error| {
            metrics::record_webhook_rejected("payload");
            tracing::warn!(%error, "Rejected malformed webhook");
        })?;

        let reference = notification.reference.clone();
        let event = notification.event.clone();

        let store = self.store(EntryPath::Webhook);
        store
            .send(ReconciliationAction::NotificationReceived { notification })
            .await;
        let state = store.state(ReconciliationState::clone).await;
        Self::record(&state);

        let transitioned = state.observed_transition();
        let outcome = match (state.phase, state.error) {
            (ReconciliationPhase::Completed, _) if transitioned => {
                NotificationOutcome::Transitioned
            },
            (ReconciliationPhase::Completed, _) => NotificationOutcome::AlreadyPaid,
            (ReconciliationPhase::Ignored, _) => NotificationOutcome::Ignored,
            (_, Some(error)) => NotificationOutcome::Failed(error),
            (_, None) => NotificationOutcome::Failed(ReconcileError::TicketUpdateFailed(
                "reconciliation did not complete".to_string(),
            )),
        };

        Ok(NotificationReceipt {
            reference,
            event,
            outcome,
        })
    }

    fn record(state: &ReconciliationState) {
        let path = state.path.as_str();
        metrics::record_reconciliation(path, state.outcome());

        let reference = state.reference.as_ref().map(Reference::as_str).unwrap_or_default();

        if state.observed_transition() {
            let quantity = state
                .ticket
                .as_ref()
                .map(|ticket| ticket.quantity)
                .or_else(|| state.metadata.as_ref().map(|metadata| metadata.quantity))
                .unwrap_or_default();
            let amount = state
                .ticket
                .as_ref()
                .map(|ticket| ticket.amount.minor())
                .unwrap_or_default();
            metrics::record_tickets_sold(quantity, amount);

            tracing::info!(
                reference,
                path,
                quantity,
                side_effect_failures = state.side_effect_failures.len(),
                "Reservation marked paid"
            );
            return;
        }

        match (&state.phase, &state.error) {
            (ReconciliationPhase::Completed, _) => {
                tracing::debug!(reference, path, "Reservation already paid");
            },
            (ReconciliationPhase::Ignored, _) => {
                tracing::debug!(reference, path, "Notification ignored");
            },
            (_, Some(error @ ReconcileError::PaymentNotSuccessful { .. })) => {
                tracing::info!(reference, path, %error, "Payment not successful");
            },
            (
                _,
                Some(
                    error @ (ReconcileError::ReservationMissing
                    | ReconcileError::TicketUpdateFailed(_)),
                ),
            ) => {
                tracing::error!(reference, path, %error, "Paid charge could not be recorded");
            },
            (_, Some(error)) => {
                tracing::warn!(reference, path, %error, "Reconciliation failed");
            },
            (_, None) => {
                tracing::warn!(
                    reference,
                    path,
                    phase = ?state.phase,
                    "Reconciliation did not settle"
                );
            },
        }
    }
}
