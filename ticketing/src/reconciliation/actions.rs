//! Actions for payment reconciliation.

use super::types::{GatewayNotification, SideEffectKind};
use crate::store::StoreError;
use crate::types::{PaidTransition, Reservation, VerifiedCharge};

/// Inputs to the reconciliation reducer.
///
/// The first two start a run; the rest are produced by effects.
#[derive(Debug, Clone)]
pub enum ReconciliationAction {
    /// Buyer asked to verify a charge.
    VerifyRequested {
        /// Reference from the query string, exactly as received
        reference: Option<String>,
    },

    /// Gateway pushed a notification whose signature already checked out.
    NotificationReceived {
        /// Parsed notification
        notification: GatewayNotification,
    },

    /// Gateway answered the verify call.
    ChargeVerified {
        /// Gateway's verdict
        charge: VerifiedCharge,
    },

    /// Gateway call failed in transport or timed out.
    GatewayUnreachable {
        /// What happened
        detail: String,
    },

    /// Gateway answered with an error.
    GatewayRejected {
        /// Gateway error message
        detail: String,
    },

    /// Conditional `paid` write finished.
    MarkedPaid {
        /// Whether this run performed the transition
        transition: PaidTransition,
    },

    /// Conditional `paid` write failed.
    MarkPaidFailed {
        /// Store error
        error: StoreError,
    },

    /// Reservation re-read finished. `None` if the read failed.
    TicketLoaded {
        /// Reservation after the write
        ticket: Option<Box<Reservation>>,
    },

    /// A best-effort side effect finished.
    SideEffectSettled {
        /// Which side effect
        kind: SideEffectKind,
        /// Failure detail, `None` on success
        failure: Option<String>,
    },
}
