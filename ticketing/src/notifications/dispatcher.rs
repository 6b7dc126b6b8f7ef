//! Best-effort confirmation dispatch.

use super::{ConfirmationMessage, Notifier};
use crate::metrics;
use crate::store::TicketStore;
use crate::types::Reservation;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Composes and sends the buyer confirmation for a paid reservation.
#[derive(Clone)]
pub struct ConfirmationDispatcher {
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn TicketStore>,
    currency: String,
    timeout: Duration,
}

impl ConfirmationDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn TicketStore>,
        currency: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            notifier,
            store,
            currency: currency.into(),
            timeout,
        }
    }

    /// Send the confirmation for `reservation`.
    ///
    /// The event date is looked up best-effort. Every failure (lookup, send,
    /// timeout) is logged and counted; the return value only reports whether
    /// the notifier accepted the message.
    #[tracing::instrument(skip(self, reservation), fields(reference = %reservation.reference))]
    pub async fn notify_confirmed(&self, reservation: &Reservation) -> bool {
        let event_date = match self.store.get_event(&reservation.event_id).await {
            Ok(event) => event.starts_at,
            Err(error) => {
                tracing::debug!(
                    event_id = %reservation.event_id,
                    %error,
                    "Event date unavailable for confirmation"
                );
                None
            },
        };

        let message = ConfirmationMessage::compose(reservation, event_date, &self.currency);

        match tokio::time::timeout(self.timeout, self.notifier.send(&message)).await {
            Ok(Ok(())) => {
                metrics::record_confirmation_sent();
                tracing::info!(to = %message.to, "Confirmation sent");
                true
            },
            Ok(Err(error)) => {
                metrics::record_side_effect_failure("email");
                tracing::warn!(%error, "Confirmation email failed");
                false
            },
            Err(_) => {
                metrics::record_side_effect_failure("email");
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis(),
                    "Confirmation email timed out"
                );
                false
            },
        }
    }

    /// Send the confirmation on a detached task and return at once.
    ///
    /// The handle resolves to the result of [`Self::notify_confirmed`];
    /// dropping it leaves the send running.
    pub fn dispatch(&self, reservation: Reservation) -> JoinHandle<bool> {
        let dispatcher = self.clone();
        tokio::spawn(
            async move { dispatcher.notify_confirmed(&reservation).await }.in_current_span(),
        )
    }
}
