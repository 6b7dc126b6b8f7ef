//! In-process payment gateway for development and tests.
//!
//! Initialized charges are remembered so `verify_charge` can echo their
//! metadata back, the way the real gateway does. By default every known
//! charge verifies as `success`; individual references can be scripted to
//! decline, time out or be rejected.

use super::{GatewayError, GatewayResult, PaymentGateway};
use crate::types::{
    ChargeRequest, InitializedCharge, Money, PurchaseMetadata, Reference, SUCCESS_STATUS,
    VerifiedCharge,
};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Scripted `verify_charge` outcome for one reference
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockVerify {
    /// Report the charge as successful
    Success,
    /// Report the charge with this gateway status (`failed`, `abandoned`, ...)
    Status(String),
    /// Fail as if the network dropped
    Unreachable,
    /// Fail with a gateway-side rejection
    Rejected(String),
    /// Answer with this HTTP status and an HTML error page
    ServerError(u16),
}

#[derive(Clone, Debug)]
struct MockCharge {
    amount: Money,
    metadata: Option<PurchaseMetadata>,
    verify: MockVerify,
}

#[derive(Default)]
struct MockState {
    charges: HashMap<Reference, MockCharge>,
    initialized: Vec<ChargeRequest>,
    initialize_failure: Option<GatewayError>,
}

/// Scriptable [`PaymentGateway`].
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    state: Arc<Mutex<MockState>>,
    verify_calls: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl MockPaymentGateway {
    /// Creates a new mock payment gateway
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every subsequent `initialize_charge` fail (or succeed again with `None`).
    pub async fn fail_initialize(&self, error: Option<GatewayError>) {
        self.state.lock().await.initialize_failure = error;
    }

    /// Register a charge that was opened elsewhere.
    pub async fn register_charge(
        &self,
        reference: Reference,
        amount: Money,
        metadata: Option<PurchaseMetadata>,
    ) {
        self.state.lock().await.charges.insert(
            reference,
            MockCharge {
                amount,
                metadata,
                verify: MockVerify::Success,
            },
        );
    }

    /// Script the verify outcome for a reference.
    ///
    /// Unknown references are registered with no metadata.
    pub async fn script(&self, reference: &Reference, verify: MockVerify) {
        let mut state = self.state.lock().await;
        let charge = state.charges.entry(reference.clone()).or_insert_with(|| MockCharge {
            amount: Money::default(),
            metadata: None,
            verify: MockVerify::Success,
        });
        charge.verify = verify;
    }

    /// Every charge request received so far, in order
    pub async fn initialized_charges(&self) -> Vec<ChargeRequest> {
        self.state.lock().await.initialized.clone()
    }

    /// Number of `verify_charge` calls so far
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn initialize_charge<'a>(
        &'a self,
        request: &'a ChargeRequest,
    ) -> BoxFuture<'a, GatewayResult<InitializedCharge>> {
        Box::pin(async move {
            self.simulate_latency().await;

            let mut state = self.state.lock().await;
            state.initialized.push(request.clone());
            if let Some(error) = state.initialize_failure.clone() {
                return Err(error);
            }

            let raw = format!("mock_ref_{}", uuid::Uuid::new_v4().simple());
            let reference = Reference::parse(&raw)
                .ok_or_else(|| GatewayError::InvalidResponse("blank reference".to_string()))?;

            state.charges.insert(
                reference.clone(),
                MockCharge {
                    amount: request.amount,
                    metadata: Some(request.metadata.clone()),
                    verify: MockVerify::Success,
                },
            );

            tracing::info!(
                reference = %reference,
                amount = request.amount.minor(),
                "Mock charge initialized"
            );

            Ok(InitializedCharge {
                redirect_url: format!("https://checkout.mock/{reference}"),
                reference,
            })
        })
    }

    fn verify_charge<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, GatewayResult<VerifiedCharge>> {
        Box::pin(async move {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate_latency().await;

            let charge = self
                .state
                .lock()
                .await
                .charges
                .get(reference)
                .cloned()
                .ok_or_else(|| GatewayError::Rejected {
                    status: Some(400),
                    message: "Transaction reference not found".to_string(),
                })?;

            let status = match charge.verify {
                MockVerify::Success => SUCCESS_STATUS.to_string(),
                MockVerify::Status(status) => status,
                MockVerify::Unreachable => {
                    return Err(GatewayError::Unreachable("mock network failure".to_string()));
                },
                MockVerify::Rejected(message) => {
                    return Err(GatewayError::Rejected {
                        status: Some(400),
                        message,
                    });
                },
                MockVerify::ServerError(status) => {
                    return Err(GatewayError::Rejected {
                        status: Some(status),
                        message: "<html>Service Unavailable</html>".to_string(),
                    });
                },
            };

            Ok(VerifiedCharge {
                reference: reference.clone(),
                status,
                amount: Some(charge.amount),
                metadata: charge.metadata,
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::EventId;

    fn request() -> ChargeRequest {
        ChargeRequest {
            amount: Money::from_minor(750_000),
            currency: "NGN".to_string(),
            email: "ada@example.com".to_string(),
            callback_url: "http://localhost/verify".to_string(),
            metadata: PurchaseMetadata {
                event_id: EventId::parse("evt_1").unwrap(),
                event_title: "Friday Jazz".to_string(),
                buyer_name: "Ada".to_string(),
                phone: None,
                quantity: 3,
            },
        }
    }

    #[tokio::test]
    async fn test_verify_echoes_metadata() {
        let gateway = MockPaymentGateway::new();
        let charge = gateway.initialize_charge(&request()).await.unwrap();

        assert!(charge.reference.as_str().starts_with("mock_ref_"));

        let verified = gateway.verify_charge(&charge.reference).await.unwrap();
        assert!(verified.succeeded());
        assert_eq!(verified.metadata.unwrap().quantity, 3);
        assert_eq!(verified.amount, Some(Money::from_minor(750_000)));
    }

    #[tokio::test]
    async fn test_scripted_decline() {
        let gateway = MockPaymentGateway::new();
        let charge = gateway.initialize_charge(&request()).await.unwrap();
        gateway
            .script(&charge.reference, MockVerify::Status("failed".to_string()))
            .await;

        let verified = gateway.verify_charge(&charge.reference).await.unwrap();
        assert!(!verified.succeeded());
        assert_eq!(verified.status, "failed");
    }

    #[tokio::test]
    async fn test_scripted_unreachable() {
        let gateway = MockPaymentGateway::new();
        let reference = Reference::parse("ref_1").unwrap();
        gateway.script(&reference, MockVerify::Unreachable).await;

        let result = gateway.verify_charge(&reference).await;
        assert!(matches!(result, Err(GatewayError::Unreachable(_))));
        assert_eq!(gateway.verify_calls(), 1);
    }

    #[tokio::test]
    async fn test_initialize_failure_is_recorded() {
        let gateway = MockPaymentGateway::new();
        gateway
            .fail_initialize(Some(GatewayError::Rejected {
                status: Some(401),
                message: "Invalid key".to_string(),
            }))
            .await;

        let result = gateway.initialize_charge(&request()).await;

        assert!(matches!(result, Err(GatewayError::Rejected { .. })));
        assert_eq!(gateway.initialized_charges().await.len(), 1);
    }
}
