//! HTTP API handlers.
//!
//! - Reservations: open a charge and record the pending reservation
//! - Payments: buyer-initiated verification and gateway webhooks

pub mod error;
pub mod payments;
pub mod reservations;

pub use error::ApiError;
pub use payments::{payment_webhook, verify_payment};
pub use reservations::{create_reservation, get_reservation};
