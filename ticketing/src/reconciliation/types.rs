//! State and error types for payment reconciliation.

use crate::types::{PaidTransition, PurchaseMetadata, Reference, Reservation};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Webhook event type that confirms a payment
pub const CHARGE_SUCCESS_EVENT: &str = "charge.success";

/// How the reconciliation was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPath {
    /// Buyer returned from the payment page and asked us to verify
    Verify,
    /// Gateway pushed a signed notification
    Webhook,
}

impl EntryPath {
    /// Metric/log label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Webhook => "webhook",
        }
    }
}

/// Where a single reconciliation run currently is.
///
/// ```text
/// Idle ─► Verifying ─► MarkingPaid ─► LoadingTicket ─► Completed
///   │         │             │
///   │         └─────────────┴──► Failed
///   └──► Ignored (webhook for another event type)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationPhase {
    /// Nothing received yet
    Idle,
    /// Waiting for the gateway's verdict
    Verifying,
    /// Waiting for the conditional `pending → paid` write
    MarkingPaid,
    /// Re-reading the reservation
    LoadingTicket,
    /// Reservation is `paid`
    Completed,
    /// Notification acknowledged without action
    Ignored,
    /// Stopped with an error (see [`ReconciliationState::error`])
    Failed,
}

/// Failures that prevent a correct `paid` state. These are surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Verify called without a reference
    #[error("no reference")]
    MissingReference,
    /// Transport failure or timeout talking to the gateway; retryable
    #[error("gateway unreachable: {0}")]
    GatewayUnreachable(String),
    /// The gateway answered with an error
    #[error("gateway error: {0}")]
    Gateway(String),
    /// The gateway says the charge did not succeed (terminal)
    #[error("payment not successful: {status}")]
    PaymentNotSuccessful {
        /// Gateway's own status string
        status: String,
    },
    /// The charge succeeded but there is no local reservation for it
    #[error("reservation not found")]
    ReservationMissing,
    /// The `paid` write failed
    #[error("ticket update failed: {0}")]
    TicketUpdateFailed(String),
}

impl ReconcileError {
    /// Machine-readable code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingReference => "MISSING_REFERENCE",
            Self::GatewayUnreachable(_) => "GATEWAY_UNREACHABLE",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::PaymentNotSuccessful { .. } => "PAYMENT_NOT_SUCCESSFUL",
            Self::ReservationMissing => "RESERVATION_MISSING",
            Self::TicketUpdateFailed(_) => "TICKET_UPDATE_FAILED",
        }
    }

    /// Whether the same call may succeed later
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::GatewayUnreachable(_))
    }
}

/// Webhook rejected before any state was touched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Signature missing or not matching the body
    #[error("invalid signature")]
    InvalidSignature,
    /// Signature fine, body unreadable
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Best-effort work run after an observed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffectKind {
    /// Event sold-count increment
    SoldCount,
    /// Buyer confirmation email
    Confirmation,
}

impl SideEffectKind {
    /// Metric/log label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SoldCount => "sold_count",
            Self::Confirmation => "email",
        }
    }
}

/// A side effect that did not complete. Logged and counted, never surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectFailure {
    /// Which side effect
    pub kind: SideEffectKind,
    /// What went wrong
    pub detail: String,
}

/// Parsed gateway webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayNotification {
    /// Event type (`charge.success`, `transfer.failed`, ...)
    pub event: String,
    /// Charge reference
    pub reference: Reference,
    /// Charge status inside the payload, when present
    pub status: Option<String>,
    /// Echoed purchase intent, when intact
    pub metadata: Option<PurchaseMetadata>,
}

#[derive(Deserialize)]
struct RawNotification {
    event: String,
    data: RawNotificationData,
}

#[derive(Deserialize)]
struct RawNotificationData {
    reference: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl GatewayNotification {
    /// Parse a webhook body. Call only after the signature was verified.
    ///
    /// # Errors
    ///
    /// [`WebhookError::MalformedPayload`] if the body is not JSON, lacks
    /// `event` or `data.reference`, or the reference is blank.
    pub fn parse(raw_body: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawNotification = serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        let reference = Reference::parse(&raw.data.reference)
            .ok_or_else(|| WebhookError::MalformedPayload("blank reference".to_string()))?;

        Ok(Self {
            event: raw.event,
            reference,
            status: raw.data.status,
            metadata: PurchaseMetadata::from_gateway_value(raw.data.metadata),
        })
    }

    /// Whether this notification confirms a payment
    #[must_use]
    pub fn is_charge_success(&self) -> bool {
        self.event == CHARGE_SUCCESS_EVENT
    }
}

/// State of one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconciliationState {
    /// Entry point
    pub path: EntryPath,
    /// Current phase
    pub phase: ReconciliationPhase,
    /// Reference being reconciled
    pub reference: Option<Reference>,
    /// Purchase intent echoed by the gateway
    pub metadata: Option<PurchaseMetadata>,
    /// Result of the conditional write
    pub transition: Option<PaidTransition>,
    /// Reservation as re-read after the write
    pub ticket: Option<Reservation>,
    /// Error that stopped the run
    pub error: Option<ReconcileError>,
    /// Side effects that failed
    pub side_effect_failures: Vec<SideEffectFailure>,
    /// Awaited side effects still running; the confirmation runs detached
    pub pending_side_effects: usize,
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,
    /// When the run reached a terminal phase
    pub finished_at: Option<DateTime<Utc>>,
}

impl ReconciliationState {
    /// Fresh state for one run
    #[must_use]
    pub const fn new(path: EntryPath) -> Self {
        Self {
            path,
            phase: ReconciliationPhase::Idle,
            reference: None,
            metadata: None,
            transition: None,
            ticket: None,
            error: None,
            side_effect_failures: Vec::new(),
            pending_side_effects: 0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Run stopped with an error
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.phase == ReconciliationPhase::Failed
    }

    /// Reservation is `paid`
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.phase == ReconciliationPhase::Completed
    }

    /// Whether this run performed the `pending → paid` transition
    #[must_use]
    pub fn observed_transition(&self) -> bool {
        self.transition.is_some_and(|t| t.is_transition())
    }

    /// Metric label for the final outcome
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match (self.phase, self.transition) {
            (ReconciliationPhase::Completed, Some(PaidTransition::Transitioned)) => "transitioned",
            (ReconciliationPhase::Completed, _) => "already_paid",
            (ReconciliationPhase::Ignored, _) => "ignored",
            (ReconciliationPhase::Failed, _) => "failed",
            _ => "incomplete",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_charge_success() {
        let body = br#"{
            "event": "charge.success",
            "data": {
                "reference": "ref_1",
                "status": "success",
                "metadata": {
                    "eventId": "evt_1",
                    "eventTitle": "Friday Jazz",
                    "buyerName": "Ada",
                    "quantity": 2
                }
            }
        }"#;

        let notification = GatewayNotification::parse(body).unwrap();

        assert!(notification.is_charge_success());
        assert_eq!(notification.reference.as_str(), "ref_1");
        assert_eq!(notification.metadata.unwrap().quantity, 2);
    }

    #[test]
    fn test_parse_tolerates_missing_metadata() {
        let body = br#"{"event":"charge.success","data":{"reference":"ref_1","metadata":""}}"#;
        let notification = GatewayNotification::parse(body).unwrap();
        assert!(notification.metadata.is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            GatewayNotification::parse(b"not json"),
            Err(WebhookError::MalformedPayload(_))
        ));
        assert!(matches!(
            GatewayNotification::parse(br#"{"event":"charge.success","data":{}}"#),
            Err(WebhookError::MalformedPayload(_))
        ));
        assert!(matches!(
            GatewayNotification::parse(br#"{"event":"charge.success","data":{"reference":"  "}}"#),
            Err(WebhookError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        let error = ReconcileError::PaymentNotSuccessful {
            status: "failed".to_string(),
        };
        assert_eq!(error.to_string(), "payment not successful: failed");
        assert_eq!(ReconcileError::MissingReference.to_string(), "no reference");
        assert!(ReconcileError::GatewayUnreachable("timeout".to_string()).is_retryable());
        assert!(!error.is_retryable());
    }
}
