//! Payment-to-ticket reconciliation.
//!
//! Two independent triggers report that a buyer paid:
//!
//! ```text
//! buyer redirect ─► verify(reference) ─► gateway.verify_charge ─┐
//!                                                               ├─► store.mark_paid (CAS)
//! gateway push ──► handle_notification(body, signature) ────────┘        │
//!                                                       Transitioned? ───┤
//!                                                                        ├─► increment sold count
//!                                                                        └─► send confirmation
//! ```
//!
//! They may arrive in any order, concurrently, or more than once. Both end in
//! the same conditional write, and only the run that observes
//! [`PaidTransition::Transitioned`](crate::types::PaidTransition) fires the
//! side effects. The counter and the email are best-effort: their failures
//! are logged and counted but never fail the run.

pub mod actions;
pub mod engine;
pub mod environment;
pub mod reducer;
#[cfg(test)]
mod tests;
pub mod types;

pub use actions::ReconciliationAction;
pub use engine::{
    NotificationOutcome, NotificationReceipt, ReconciliationEngine, ReconciliationStore,
    VerifiedTicket,
};
pub use environment::ReconciliationEnvironment;
pub use reducer::ReconciliationReducer;
pub use types::{
    EntryPath, GatewayNotification, ReconcileError, ReconciliationPhase, ReconciliationState,
    SideEffectFailure, SideEffectKind, WebhookError,
};
