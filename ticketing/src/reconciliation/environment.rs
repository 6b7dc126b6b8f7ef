//! Environment for the reconciliation reducer.

use crate::gateway::PaymentGateway;
use crate::notifications::ConfirmationDispatcher;
use crate::store::TicketStore;
use std::sync::Arc;
use std::time::Duration;
use ticketpay_core::environment::Clock;

/// Everything the reconciliation reducer's effects talk to.
///
/// Production wires the HTTP gateway and the configured store; tests use
/// `MockPaymentGateway`, `InMemoryTicketStore` and `FixedClock`.
#[derive(Clone)]
pub struct ReconciliationEnvironment {
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn TicketStore>,
    dispatcher: ConfirmationDispatcher,
    gateway_timeout: Duration,
}

impl ReconciliationEnvironment {
    /// Create a new environment.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn TicketStore>,
        dispatcher: ConfirmationDispatcher,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            clock,
            gateway,
            store,
            dispatcher,
            gateway_timeout,
        }
    }

    /// Clock for timestamps
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Payment gateway
    #[must_use]
    pub fn gateway(&self) -> Arc<dyn PaymentGateway> {
        Arc::clone(&self.gateway)
    }

    /// Ticket store
    #[must_use]
    pub fn store(&self) -> Arc<dyn TicketStore> {
        Arc::clone(&self.store)
    }

    /// Confirmation dispatcher
    #[must_use]
    pub fn dispatcher(&self) -> ConfirmationDispatcher {
        self.dispatcher.clone()
    }

    /// Upper bound on one gateway call
    #[must_use]
    pub const fn gateway_timeout(&self) -> Duration {
        self.gateway_timeout
    }
}
