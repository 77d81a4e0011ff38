//! API error types and responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use gamify_engine::EngineError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Too many claims for one user in the current window.
    #[error("rate limited")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after_secs: u64,
    },

    /// The ledger kept changing during the claim. Safe to retry.
    #[error("ledger contended: {0}")]
    Contention(String),

    /// The durable store failed. Safe to retry.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many claims, slow down".to_string(),
                Some(serde_json::json!({ "retry_after_secs": retry_after_secs })),
            ),
            Self::Contention(msg) => (
                StatusCode::CONFLICT,
                "ledger_contended",
                msg.clone(),
                Some(serde_json::json!({ "retryable": true })),
            ),
            Self::StoreUnavailable(msg) => {
                tracing::error!(error = %msg, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "The ledger store is temporarily unavailable".to_string(),
                    Some(serde_json::json!({ "retryable": true })),
                )
            }
        };

        let retry_after = match &self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, secs.into());
        }
        response
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidAction(e) => Self::BadRequest(e.to_string()),
            EngineError::Contention { .. } => Self::Contention(err.to_string()),
            EngineError::Store(e) => Self::StoreUnavailable(e.to_string()),
        }
    }
}
