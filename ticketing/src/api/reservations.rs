//! Reservation API endpoints.
//!
//! - POST /api/reservations - Open a charge and store a pending reservation
//! - GET /api/reservations/:reference - Look up a reservation
//!
//! # Reservation Flow
//!
//! ```text
//! POST /api/reservations ──► gateway.initialize_charge ──► store (pending)
//!          │
//!          └── 201 {reference, redirectUrl} ──► buyer pays on redirectUrl
//! ```

#![allow(clippy::missing_errors_doc)] // Axum handlers

use super::error::ApiError;
use crate::issuer::IssueRequest;
use crate::server::state::AppState;
use crate::store::StoreError;
use crate::types::{Reference, Reservation};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Ticket price as sent by clients: `2500`, `19.99` or `"2500"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceField {
    /// JSON number
    Number(serde_json::Number),
    /// Decimal text
    Text(String),
}

impl Default for PriceField {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl PriceField {
    fn into_text(self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// Request to reserve tickets.
///
/// Missing fields deserialize to empty values so that validation can name
/// the offending field instead of failing on the JSON shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateReservationRequest {
    /// Event to buy tickets for
    pub event_id: String,
    /// Event title shown to the buyer
    pub event_title: String,
    /// Buyer name
    pub name: String,
    /// Buyer email
    pub email: String,
    /// Buyer phone
    pub phone: Option<String>,
    /// Number of tickets
    pub quantity: i64,
    /// Price of one ticket in major units
    pub unit_price: PriceField,
}

impl From<CreateReservationRequest> for IssueRequest {
    fn from(request: CreateReservationRequest) -> Self {
        Self {
            event_id: request.event_id,
            event_title: request.event_title,
            buyer_name: request.name,
            email: request.email,
            phone: request.phone,
            quantity: request.quantity,
            unit_price: request.unit_price.into_text(),
        }
    }
}

/// Response after opening a charge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationResponse {
    /// Ticket reference (gateway reference)
    pub reference: Reference,
    /// Payment page to redirect the buyer to
    pub redirect_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a reservation.
///
/// Validates the purchase, opens the charge at the gateway and stores the
/// reservation as `pending` under the gateway's reference.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/reservations \
///   -H "Content-Type: application/json" \
///   -d '{"eventId":"evt_1","eventTitle":"Friday Jazz","name":"Ada",
///        "email":"ada@example.com","quantity":3,"unitPrice":2500}'
/// # {"reference":"...","redirectUrl":"https://checkout.paystack.com/..."}
/// ```
pub async fn create_reservation(
    State(state): State<AppState>,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateReservationResponse>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
            .with_code("VALIDATION_ERROR")
    })?;

    let issued = state.issuer.issue(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateReservationResponse {
            reference: issued.reference,
            redirect_url: issued.redirect_url,
        }),
    ))
}

/// Get a reservation by reference.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/reservations/7PVGX8MEk85tgeEpVDtD
/// ```
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Reservation>, ApiError> {
    let parsed = Reference::parse(&reference)
        .ok_or_else(|| ApiError::not_found("Reservation", &reference))?;

    match state.store.get_reservation(&parsed).await {
        Ok(reservation) => Ok(Json(reservation)),
        Err(StoreError::NotFound(_)) => Err(ApiError::not_found("Reservation", parsed)),
        Err(error) => Err(ApiError::internal("failed to load reservation")
            .with_source(anyhow::Error::new(error))),
    }
}
