//! Reservation issuing.
//!
//! A reservation only exists once the gateway has accepted the charge: the
//! gateway's reference becomes the reservation key, so every later
//! notification about the payment can find it.
//!
//! ```text
//! IssueRequest ──validate──► PurchaseIntent ──initialize_charge──► reference
//!                                                                     │
//!                                    create_reservation(pending) ◄────┘
//! ```

use crate::gateway::{GatewayError, PaymentGateway};
use crate::metrics;
use crate::store::{StoreError, TicketStore};
use crate::types::{Buyer, ChargeRequest, EventId, Money, PurchaseIntent, Reference, Reservation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use ticketpay_core::environment::Clock;

/// Unvalidated purchase request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IssueRequest {
    /// Event id
    pub event_id: String,
    /// Event title
    pub event_title: String,
    /// Buyer name
    pub buyer_name: String,
    /// Buyer email
    pub email: String,
    /// Buyer phone
    pub phone: Option<String>,
    /// Ticket count
    pub quantity: i64,
    /// Price of one ticket as decimal text in major units (`"2500"`, `"19.99"`)
    pub unit_price: String,
}

/// Charge opened and reservation stored
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedReservation {
    /// Gateway reference (ticket id)
    pub reference: Reference,
    /// Payment page to send the buyer to
    pub redirect_url: String,
    /// Total charged in minor units
    pub amount: Money,
}

/// Issue errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueError {
    /// Bad input; nothing was sent to the gateway
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
    /// The gateway refused or could not be reached; nothing was stored
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The gateway handed out a reference that is already stored
    #[error("reservation {0} already exists")]
    DuplicateReference(Reference),
    /// The charge exists at the gateway but the reservation was not stored
    #[error("failed to store reservation {reference}: {source}")]
    Store {
        /// Reference of the orphaned charge
        reference: Reference,
        /// Underlying store error
        source: StoreError,
    },
}

impl IssueError {
    fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl IssueRequest {
    /// Check every field and build the purchase intent.
    ///
    /// # Errors
    ///
    /// [`IssueError::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<PurchaseIntent, IssueError> {
        let event_id = EventId::parse(&self.event_id)
            .ok_or_else(|| IssueError::validation("eventId", "is required"))?;

        let name = self.buyer_name.trim();
        if name.is_empty() {
            return Err(IssueError::validation("name", "is required"));
        }

        let email = self.email.trim();
        if email.is_empty() {
            return Err(IssueError::validation("email", "is required"));
        }
        if !email.contains('@') {
            return Err(IssueError::validation("email", "is not an email address"));
        }

        if self.quantity <= 0 {
            return Err(IssueError::validation("quantity", "must be at least 1"));
        }
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| IssueError::validation("quantity", "is too large"))?;

        let unit_price = Money::from_major_str(&self.unit_price)
            .map_err(|e| IssueError::validation("unitPrice", e.to_string()))?;

        Ok(PurchaseIntent {
            event_id,
            event_title: self.event_title.trim().to_string(),
            buyer: Buyer {
                name: name.to_string(),
                email: email.to_string(),
                phone: self
                    .phone
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            },
            quantity,
            unit_price,
        })
    }
}

/// Opens charges and records pending reservations.
#[derive(Clone)]
pub struct ReservationIssuer {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    currency: String,
    callback_url: String,
}

impl ReservationIssuer {
    /// Creates an issuer.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        currency: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            clock,
            currency: currency.into(),
            callback_url: callback_url.into(),
        }
    }

    /// Validate, open the charge, then store the pending reservation.
    ///
    /// # Errors
    ///
    /// - [`IssueError::Validation`]: nothing was sent to the gateway
    /// - [`IssueError::Gateway`]: the gateway error, verbatim; nothing stored
    /// - [`IssueError::DuplicateReference`]: existing record left untouched
    /// - [`IssueError::Store`]: the charge exists at the gateway without a
    ///   local reservation
    #[tracing::instrument(skip(self, request), fields(event_id = %request.event_id))]
    pub async fn issue(&self, request: IssueRequest) -> Result<IssuedReservation, IssueError> {
        let intent = request.validate().inspect_err(|error| {
            metrics::record_reservation_issue_failed("validation");
            tracing::debug!(%error, "Rejected purchase request");
        })?;

        let amount = intent.amount().ok_or_else(|| {
            metrics::record_reservation_issue_failed("validation");
            IssueError::validation("quantity", "total amount overflows")
        })?;

        let charge_request = ChargeRequest {
            amount,
            currency: self.currency.clone(),
            email: intent.buyer.email.clone(),
            callback_url: self.callback_url.clone(),
            metadata: intent.metadata(),
        };

        let charge = self.gateway.initialize_charge(&charge_request).await.map_err(|error| {
            metrics::record_reservation_issue_failed("gateway");
            tracing::warn!(%error, amount = amount.minor(), "Gateway did not open the charge");
            IssueError::Gateway(error)
        })?;

        let reservation =
            Reservation::pending(charge.reference.clone(), &intent, amount, self.clock.now());

        match self.store.create_reservation(&reservation).await {
            Ok(()) => {},
            Err(StoreError::AlreadyExists(reference)) => {
                metrics::record_reservation_issue_failed("conflict");
                tracing::error!(
                    reference = %reference,
                    "Gateway reused a reference that is already stored"
                );
                return Err(IssueError::DuplicateReference(reference));
            },
            Err(source) => {
                metrics::record_reservation_issue_failed("store");
                tracing::error!(
                    reference = %charge.reference,
                    amount = amount.minor(),
                    error = %source,
                    "Charge opened but reservation not stored (orphaned charge)"
                );
                return Err(IssueError::Store {
                    reference: charge.reference,
                    source,
                });
            },
        }

        metrics::record_reservation_issued(intent.quantity);
        tracing::info!(
            reference = %reservation.reference,
            quantity = intent.quantity,
            amount = amount.minor(),
            "Reservation issued"
        );

        Ok(IssuedReservation {
            reference: charge.reference,
            redirect_url: charge.redirect_url,
            amount,
        })
    }
}
