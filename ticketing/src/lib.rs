//! Ticket payment reconciliation.
//!
//! Sells tickets through a hosted payment gateway and turns confirmed payments
//! into paid tickets:
//!
//! - **Reservation issuing**: validate a purchase, open a charge, record the
//!   reservation as `pending` under the gateway's reference
//! - **Reconciliation**: a buyer-initiated verify and a gateway webhook both
//!   report payment; either may come first, concurrently, or repeatedly
//! - **Side effects**: the event's sold count and the buyer's confirmation
//!   email, fired once per reservation and never allowed to fail the payment
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────────┐
//!  POST /reservations│  ReservationIssuer   │──► PaymentGateway.initialize_charge
//!  ─────────────────►│                      │──► TicketStore.create_reservation
//!                    └──────────────────────┘
//!                    ┌──────────────────────┐
//!  GET /verify ─────►│ ReconciliationEngine │──► PaymentGateway.verify_charge
//!  POST /webhook ───►│  (reducer + Store)   │──► TicketStore.mark_paid (CAS)
//!                    └──────────────────────┘        │ Transitioned
//!                                                    ├─► increment_sold_count
//!                                                    └─► ConfirmationDispatcher
//! ```
//!
//! Every adapter is a trait object; the in-memory store and the mock gateway
//! are complete implementations used by the tests and for local development.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod app;
pub mod config;
pub mod gateway;
pub mod issuer;
pub mod metrics;
pub mod notifications;
pub mod reconciliation;
pub mod server;
pub mod store;
pub mod types;

pub use app::TicketingApp;
pub use config::Config;
pub use issuer::{IssueError, IssueRequest, IssuedReservation, ReservationIssuer};
pub use reconciliation::{ReconcileError, ReconciliationEngine, WebhookError};
pub use types::*;
