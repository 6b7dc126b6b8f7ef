//! Payment API endpoints.
//!
//! - GET /api/payments/verify?reference=... - Buyer returns from the payment page
//! - POST /api/payments/webhook - Gateway pushes a signed event
//!
//! Both lead to the same idempotent transition, so they may arrive in any
//! order and any number of times.

#![allow(clippy::missing_errors_doc)] // Axum handlers

use super::error::ApiError;
use crate::gateway::SIGNATURE_HEADER;
use crate::reconciliation::NotificationOutcome;
use crate::server::state::AppState;
use crate::types::{Reference, Reservation, ReservationStatus};
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query string of the verify endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    /// Gateway reference
    pub reference: Option<String>,
}

/// Verified payment.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Reference that is now paid
    pub reference: Reference,
    /// Always `paid`
    pub status: ReservationStatus,
    /// Reservation after the write; `null` if it could not be re-read
    pub ticket: Option<Reservation>,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    /// Always `true`
    pub received: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Verify a payment and mark the reservation paid.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/payments/verify?reference=7PVGX8MEk85tgeEpVDtD"
/// # {"reference":"7PVGX8MEk85tgeEpVDtD","status":"paid","ticket":{...}}
/// ```
pub async fn verify_payment(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let reference = query.reference.as_deref();
    let verified = state
        .engine
        .verify(reference)
        .await
        .map_err(|error| ApiError::from_reconcile(error, reference))?;

    Ok(Json(VerifyResponse {
        reference: verified.reference,
        status: ReservationStatus::Paid,
        ticket: verified.ticket,
    }))
}

/// Receive a gateway webhook.
///
/// The body is taken as raw bytes: the signature covers the exact bytes
/// sent. Once the signature and body are accepted the response is always
/// `200`, so the gateway does not redeliver events that were processed or
/// that can only be fixed by the verify path.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/payments/webhook \
///   -H "x-paystack-signature: $SIG" \
///   -d '{"event":"charge.success","data":{"reference":"7PVGX8MEk85tgeEpVDtD"}}'
/// # {"received":true}
/// ```
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let receipt = state.engine.handle_notification(&body, signature).await?;

    if let NotificationOutcome::Failed(error) = &receipt.outcome {
        tracing::warn!(
            reference = %receipt.reference,
            event = %receipt.event,
            %error,
            "Webhook acknowledged but not applied"
        );
    }

    Ok(Json(WebhookAck { received: true }))
}
