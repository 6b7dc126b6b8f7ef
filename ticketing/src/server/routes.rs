//! Router configuration for the ticketing service.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{payments, reservations};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `/health`, `/ready`
/// - `/api/reservations`, `/api/reservations/:reference`
/// - `/api/payments/verify`, `/api/payments/webhook`
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Reservations
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations/:reference", get(reservations::get_reservation))
        // Payments
        .route("/payments/verify", get(payments::verify_payment))
        .route("/payments/webhook", post(payments::payment_webhook));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
