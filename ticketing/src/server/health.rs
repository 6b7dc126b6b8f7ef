//! Health check endpoints for the ticketing service.

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Health check endpoint.
///
/// Returns 200 OK if the service is running. Dependencies are not checked.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Ticket store adapter in use
    pub store: &'static str,
    /// Payment gateway adapter in use
    pub gateway: &'static str,
    /// Confirmation notifier in use
    pub notifier: &'static str,
}

/// Readiness check endpoint.
///
/// The store is connected (and migrated) before the listener is bound, so a
/// serving process is ready; the response reports which adapters it runs on.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"ready":true,"store":"postgres","gateway":"http","notifier":"console"}
/// ```
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    (
        StatusCode::OK,
        Json(ReadinessResponse {
            ready: true,
            store: state.backends.store,
            gateway: state.backends.gateway,
            notifier: state.backends.notifier,
        }),
    )
}
