//! Paystack-compatible HTTP gateway.
//!
//! Every response is wrapped in `{status, message, data}`. A `false` status or
//! a non-2xx code is a rejection; a transport failure or timeout is
//! [`GatewayError::Unreachable`].

use super::{GatewayError, GatewayResult, PaymentGateway};
use crate::config::GatewayConfig;
use crate::metrics;
use crate::types::{
    ChargeRequest, InitializedCharge, Money, PurchaseMetadata, Reference, VerifiedCharge,
};
use futures::future::BoxFuture;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

/// Gateway adapter over `reqwest`.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: Url,
    secret_key: String,
}

#[derive(Deserialize)]
struct Envelope {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    #[serde(default)]
    amount: Option<u64>,
    #[serde(default)]
    metadata: Option<Value>,
}

impl HttpPaymentGateway {
    /// Builds the adapter from configuration.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Configuration`] for an invalid base URL or if the HTTP
    /// client cannot be built.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        Self::with_timeout(&config.base_url, &config.secret_key, config.timeout())
    }

    /// Builds the adapter with explicit settings.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Configuration`] for an invalid base URL or if the HTTP
    /// client cannot be built.
    pub fn with_timeout(
        base_url: &str,
        secret_key: &str,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| {
                GatewayError::Configuration(format!("invalid base URL '{base_url}': {e}"))
            })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Configuration(format!("'{base_url}' cannot be a base URL")));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            secret_key: secret_key.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::Configuration(format!("'{}' cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_data<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
        let http_status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable(format!("failed to read response body: {e}")))?;

        let envelope: Envelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if http_status.is_success() => {
                return Err(GatewayError::InvalidResponse(format!("unreadable body: {e}")));
            },
            Err(_) => {
                return Err(GatewayError::Rejected {
                    status: Some(http_status.as_u16()),
                    message: body.chars().take(200).collect(),
                });
            },
        };

        if !http_status.is_success() || !envelope.status {
            return Err(GatewayError::Rejected {
                status: Some(http_status.as_u16()),
                message: envelope.message,
            });
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::InvalidResponse("response has no data".to_string()))?;
        serde_json::from_value(data)
            .map_err(|e| GatewayError::InvalidResponse(format!("unexpected data shape: {e}")))
    }

    fn transport_error(error: &reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Unreachable(format!("timed out: {error}"))
        } else {
            GatewayError::Unreachable(error.to_string())
        }
    }
}

impl PaymentGateway for HttpPaymentGateway {
    fn initialize_charge<'a>(
        &'a self,
        request: &'a ChargeRequest,
    ) -> BoxFuture<'a, GatewayResult<InitializedCharge>> {
        Box::pin(async move {
            let url = self.endpoint(&["transaction", "initialize"])?;
            let body = json!({
                "email": request.email,
                "amount": request.amount.minor(),
                "currency": request.currency,
                "callback_url": request.callback_url,
                "metadata": request.metadata,
            });

            let started = Instant::now();
            let result = self
                .client
                .post(url)
                .bearer_auth(&self.secret_key)
                .json(&body)
                .send()
                .await;
            metrics::record_gateway_call("initialize", started.elapsed());

            let response = result.map_err(|e| Self::transport_error(&e))?;
            let data: InitializeData = Self::read_data(response).await?;

            let reference = Reference::parse(&data.reference)
                .ok_or_else(|| GatewayError::InvalidResponse("blank reference".to_string()))?;

            tracing::debug!(
                reference = %reference,
                amount = request.amount.minor(),
                "Charge initialized"
            );

            Ok(InitializedCharge {
                reference,
                redirect_url: data.authorization_url,
            })
        })
    }

    fn verify_charge<'a>(
        &'a self,
        reference: &'a Reference,
    ) -> BoxFuture<'a, GatewayResult<VerifiedCharge>> {
        Box::pin(async move {
            let url = self.endpoint(&["transaction", "verify", reference.as_str()])?;

            let started = Instant::now();
            let result = self.client.get(url).bearer_auth(&self.secret_key).send().await;
            metrics::record_gateway_call("verify", started.elapsed());

            let response = result.map_err(|e| Self::transport_error(&e))?;
            let data: VerifyData = Self::read_data(response).await?;

            if data.reference != reference.as_str() {
                tracing::warn!(
                    requested = %reference,
                    returned = %data.reference,
                    "Gateway returned a different reference"
                );
                return Err(GatewayError::InvalidResponse(format!(
                    "verification for {reference} answered for {}",
                    data.reference
                )));
            }

            Ok(VerifiedCharge {
                reference: reference.clone(),
                status: data.status,
                amount: data.amount.map(Money::from_minor),
                metadata: PurchaseMetadata::from_gateway_value(data.metadata),
            })
        })
    }
}
