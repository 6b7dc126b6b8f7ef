//! Application wiring.
//!
//! Builds the adapters selected in [`Config`] and assembles the issuer, the
//! reconciliation engine and the HTTP state from them.

use crate::config::{Config, EmailProvider, GatewayBackend, StoreBackend};
use crate::gateway::{GatewayError, HttpPaymentGateway, MockPaymentGateway, PaymentGateway};
use crate::issuer::ReservationIssuer;
use crate::notifications::console::ConsoleNotifier;
use crate::notifications::dispatcher::ConfirmationDispatcher;
use crate::notifications::email::HttpEmailNotifier;
use crate::notifications::{NotificationError, Notifier};
use crate::reconciliation::{ReconciliationEngine, ReconciliationEnvironment};
use crate::server::state::{AppState, Backends};
use crate::store::memory::InMemoryTicketStore;
use crate::store::postgres::PostgresTicketStore;
use crate::store::{StoreError, TicketStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use ticketpay_core::environment::{Clock, SystemClock};

/// Startup errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Ticket store could not be opened
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payment gateway adapter could not be built
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Notifier could not be built
    #[error("Notifier error: {0}")]
    Notifier(#[from] NotificationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Assembled ticketing application.
#[derive(Clone)]
pub struct TicketingApp {
    /// Opens charges and records pending reservations
    pub issuer: ReservationIssuer,
    /// Verify and webhook entry points
    pub engine: ReconciliationEngine,
    /// Ticket store
    pub store: Arc<dyn TicketStore>,
    backends: Backends,
}

impl TicketingApp {
    /// Connect every adapter selected in `config`.
    ///
    /// The `PostgreSQL` store is migrated before it is used.
    ///
    /// # Errors
    ///
    /// Returns error if an adapter cannot be built or the database cannot be
    /// reached.
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let (store, store_name): (Arc<dyn TicketStore>, &'static str) = match config.store.backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory ticket store; reservations are lost on restart");
                (Arc::new(InMemoryTicketStore::new()), "memory")
            },
            StoreBackend::Postgres => {
                let url = config
                    .store
                    .database_url
                    .as_deref()
                    .ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))?;
                let store = PostgresTicketStore::connect(
                    url,
                    config.store.max_connections,
                    Duration::from_secs(config.store.connect_timeout),
                )
                .await?;
                tracing::info!("Running ticket store migrations...");
                store.migrate().await?;
                (Arc::new(store), "postgres")
            },
        };

        let (gateway, gateway_name): (Arc<dyn PaymentGateway>, &'static str) =
            match config.gateway.backend {
                GatewayBackend::Http => {
                    (Arc::new(HttpPaymentGateway::new(&config.gateway)?), "http")
                },
                GatewayBackend::Mock => {
                    tracing::warn!("Using mock payment gateway; no real charges are made");
                    (Arc::new(MockPaymentGateway::new()), "mock")
                },
            };

        let (notifier, notifier_name): (Arc<dyn Notifier>, &'static str) =
            match config.email.provider {
                EmailProvider::Console => (Arc::new(ConsoleNotifier::new()), "console"),
                EmailProvider::Http => (Arc::new(HttpEmailNotifier::new(&config.email)?), "http"),
            };

        let app = Self::assemble(config, store, gateway, notifier, Arc::new(SystemClock));
        tracing::info!(
            store = store_name,
            gateway = gateway_name,
            notifier = notifier_name,
            "Application assembled"
        );

        Ok(Self {
            backends: Backends {
                store: store_name,
                gateway: gateway_name,
                notifier: notifier_name,
            },
            ..app
        })
    }

    /// Assemble the application around already-built adapters.
    #[must_use]
    pub fn assemble(
        config: &Config,
        store: Arc<dyn TicketStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher = ConfirmationDispatcher::new(
            notifier,
            Arc::clone(&store),
            config.gateway.currency.clone(),
            config.email.timeout(),
        );

        let issuer = ReservationIssuer::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            Arc::clone(&clock),
            config.gateway.currency.clone(),
            config.gateway.callback_url.clone(),
        );

        let environment = ReconciliationEnvironment::new(
            clock,
            gateway,
            Arc::clone(&store),
            dispatcher,
            config.gateway.timeout(),
        );
        let engine = ReconciliationEngine::new(environment, config.gateway.webhook_secret.clone());

        Self {
            issuer,
            engine,
            store,
            backends: Backends {
                store: "custom",
                gateway: "custom",
                notifier: "custom",
            },
        }
    }

    /// HTTP handler state
    #[must_use]
    pub fn state(&self) -> AppState {
        AppState::new(
            self.issuer.clone(),
            self.engine.clone(),
            Arc::clone(&self.store),
            self.backends.clone(),
        )
    }
}
