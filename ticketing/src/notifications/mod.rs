//! Buyer confirmation after a ticket is paid.
//!
//! Delivery is best-effort. [`ConfirmationDispatcher::notify_confirmed`] never
//! returns an error: a lost email must not undo or fail a reconciliation that
//! already wrote `paid`.

pub mod console;
pub mod dispatcher;
pub mod email;

pub use console::{ConsoleNotifier, RecordingNotifier};
pub use dispatcher::ConfirmationDispatcher;
pub use email::HttpEmailNotifier;

use crate::types::{Reference, Reservation};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use thiserror::Error;

/// Notification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// Transport failure or timeout
    #[error("notification transport failed: {0}")]
    Transport(String),
    /// The provider refused the message
    #[error("notification rejected: {0}")]
    Rejected(String),
    /// The notifier is misconfigured
    #[error("notification configuration error: {0}")]
    Configuration(String),
}

/// Delivers confirmation messages.
pub trait Notifier: Send + Sync {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] if delivery failed.
    fn send<'a>(
        &'a self,
        message: &'a ConfirmationMessage,
    ) -> BoxFuture<'a, Result<(), NotificationError>>;
}

/// A composed ticket confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Ticket reference
    pub reference: Reference,
}

impl ConfirmationMessage {
    /// Compose the confirmation for a paid reservation.
    #[must_use]
    pub fn compose(
        reservation: &Reservation,
        event_date: Option<DateTime<Utc>>,
        currency: &str,
    ) -> Self {
        let date = event_date.map_or_else(
            || "date to be announced".to_string(),
            |d| d.format("%A, %-d %B %Y at %H:%M UTC").to_string(),
        );
        let tickets = if reservation.quantity == 1 { "ticket" } else { "tickets" };

        let body = format!(
            "Hi {name},\n\n\
             Your payment was received and your booking is confirmed.\n\n\
             Event:     {title}\n\
             Date:      {date}\n\
             Tickets:   {quantity} {tickets}\n\
             Amount:    {currency} {amount}\n\
             Reference: {reference}\n\n\
             Please keep this reference; it is your ticket number at the door.\n",
            name = reservation.name,
            title = reservation.event_title,
            quantity = reservation.quantity,
            amount = reservation.amount,
            reference = reservation.reference,
        );

        Self {
            to: reservation.email.clone(),
            subject: format!("Your tickets for {}", reservation.event_title),
            body,
            reference: reservation.reference.clone(),
        }
    }
}
