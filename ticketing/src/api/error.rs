//! Error type for HTTP handlers.
//!
//! Bridges domain errors and HTTP responses. Every error body is
//! `{"code": ..., "message": ...}`; server errors are logged with their
//! internal source before the response is sent.

use crate::gateway::GatewayError;
use crate::issuer::IssueError;
use crate::reconciliation::{ReconcileError, WebhookError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// ```ignore
/// async fn handler() -> Result<Json<Reservation>, ApiError> {
///     let reservation = store.get_reservation(&reference).await
///         .map_err(|_| ApiError::not_found("Reservation", &reference))?;
///     Ok(Json(reservation))
/// }
/// ```
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    code: String,
    source: Option<anyhow::Error>,
}

impl ApiError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach an internal error (logged, never sent to the client).
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace the machine-readable code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// HTTP status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST".to_string())
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED".to_string())
    }

    /// Create a 402 Payment Required error.
    #[must_use]
    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYMENT_REQUIRED, message.into(), "PAYMENT_REQUIRED".to_string())
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 502 Bad Gateway error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message.into(), "GATEWAY_ERROR".to_string())
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }

    /// Map a reconciliation failure, naming the reference in the message.
    #[must_use]
    pub fn from_reconcile(error: ReconcileError, reference: Option<&str>) -> Self {
        let message = match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reference) => format!("{error} (reference {reference})"),
            None => error.to_string(),
        };
        let code = error.code();

        let api_error = match &error {
            ReconcileError::MissingReference => Self::bad_request(message),
            ReconcileError::GatewayUnreachable(_) => Self::unavailable(message),
            ReconcileError::Gateway(_) => Self::bad_gateway(message),
            ReconcileError::PaymentNotSuccessful { .. } => Self::payment_required(message),
            ReconcileError::ReservationMissing | ReconcileError::TicketUpdateFailed(_) => {
                Self::internal(message).with_source(anyhow::Error::new(error.clone()))
            },
        };
        api_error.with_code(code)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<IssueError> for ApiError {
    fn from(error: IssueError) -> Self {
        match error {
            IssueError::Validation { .. } => {
                Self::bad_request(error.to_string()).with_code("VALIDATION_ERROR")
            },
            IssueError::Gateway(GatewayError::Unreachable(_)) => {
                Self::unavailable(error.to_string()).with_code("GATEWAY_UNREACHABLE")
            },
            IssueError::Gateway(_) => Self::bad_gateway(error.to_string()),
            IssueError::DuplicateReference(_) => Self::conflict(error.to_string()),
            IssueError::Store { ref reference, .. } => {
                let message = format!(
                    "payment was opened but the reservation could not be saved \
                     (reference {reference})"
                );
                Self::internal(message).with_source(anyhow::Error::new(error))
            },
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(error: WebhookError) -> Self {
        match error {
            WebhookError::InvalidSignature => {
                Self::unauthorized(error.to_string()).with_code("INVALID_SIGNATURE")
            },
            WebhookError::MalformedPayload(_) => {
                Self::bad_request(error.to_string()).with_code("MALFORMED_PAYLOAD")
            },
        }
    }
}
