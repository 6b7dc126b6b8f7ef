//! Application state for the ticketing HTTP server.

use crate::issuer::ReservationIssuer;
use crate::reconciliation::ReconciliationEngine;
use crate::store::TicketStore;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Opens charges and records pending reservations
    pub issuer: ReservationIssuer,

    /// Verify and webhook entry points
    pub engine: ReconciliationEngine,

    /// Ticket store, for read-only lookups
    pub store: Arc<dyn TicketStore>,

    /// Adapter names reported by the readiness probe
    pub backends: Backends,
}

/// Names of the wired adapters.
#[derive(Clone, Debug, Default)]
pub struct Backends {
    /// Ticket store adapter
    pub store: &'static str,
    /// Payment gateway adapter
    pub gateway: &'static str,
    /// Confirmation notifier
    pub notifier: &'static str,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        issuer: ReservationIssuer,
        engine: ReconciliationEngine,
        store: Arc<dyn TicketStore>,
        backends: Backends,
    ) -> Self {
        Self {
            issuer,
            engine,
            store,
            backends,
        }
    }
}
