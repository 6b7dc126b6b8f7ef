//! Payment gateway adapter.
//!
//! The core depends on [`PaymentGateway`] only. [`HttpPaymentGateway`] talks
//! to a Paystack-compatible REST API; [`MockPaymentGateway`] runs in-process
//! and can be scripted per reference.
//!
//! Webhook authentication lives in [`signature`] because it needs nothing but
//! the raw body and a shared secret.

pub mod http;
pub mod mock;
pub mod signature;

pub use http::HttpPaymentGateway;
pub use mock::{MockPaymentGateway, MockVerify};
pub use signature::{SIGNATURE_HEADER, sign, validate_signature};

use crate::types::{ChargeRequest, InitializedCharge, Reference, VerifiedCharge};
use futures::future::BoxFuture;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Payment gateway errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport failure or timeout; the gateway's verdict is unknown
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    /// The gateway answered and refused the request
    #[error("gateway rejected request: {message}")]
    Rejected {
        /// HTTP status, when there was one
        status: Option<u16>,
        /// Gateway's own message
        message: String,
    },
    /// The gateway answered with something we cannot read
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
    /// The adapter is misconfigured
    #[error("gateway configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Whether retrying the same call later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Rejected { status, .. } => status.is_some_and(|s| s >= 500),
            Self::InvalidResponse(_) | Self::Configuration(_) => false,
        }
    }
}

/// Remote charge lifecycle.
pub trait PaymentGateway: Send + Sync {
    /// Open a charge and obtain the buyer's payment page.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the charge could not be opened.
    fn initialize_charge<'a>(
        &'a self,
        request: &'a ChargeRequest,
    ) -> BoxFuture<'a, GatewayResult<InitializedCharge>>;

    /// Ask the gateway for the current outcome of a charge.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Unreachable`] on transport failure or timeout; other
    /// variants when the gateway answered with an error.
    fn verify_charge<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, GatewayResult<VerifiedCharge>>;
}
