//! Error taxonomy for the gateway's HTTP surface.
//!
//! Mirrors the error kinds from the design: `NotFound` and
//! `UpstreamTransport`/`UpstreamApplication` are the only kinds that ever
//! reach a client response; breaker-open and compensation failures are
//! absorbed earlier (by a fallback, or by the retry queue) and never surface
//! here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The requested car or rental does not exist upstream.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A transport-level failure (timeout, connection refused, DNS) occurred
    /// anywhere in the create-rental saga. Per the gateway's contract this is
    /// always surfaced with the same uniform message, regardless of which
    /// upstream actually failed.
    #[error("payment service unavailable")]
    PaymentServiceUnavailable,

    /// An upstream responded with a non-2xx application error.
    #[error("{service} service error: {detail}")]
    UpstreamApplication {
        service: &'static str,
        detail: String,
    },

    /// Malformed client input (e.g. unparsable rental dates).
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new(format!("{what} not found"))))
                    .into_response()
            }
            GatewayError::PaymentServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("Payment Service unavailable")),
            )
                .into_response(),
            GatewayError::UpstreamApplication { service, detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("{service} service error: {detail}"))),
            )
                .into_response(),
            GatewayError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(detail))).into_response()
            }
        }
    }
}
