//! Service-to-service authentication.
//!
//! End users never call this service directly; calling routes authenticate
//! them and forward the user ID together with the shared API key.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// Service authentication via API key.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Check for X-API-Key header
        let api_key = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        // Validate against configured service API key
        let expected_key = state
            .config
            .service_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if api_key != expected_key {
            return Err(ApiError::Unauthorized);
        }

        let service_name = parts
            .headers
            .get("x-service-name")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(ServiceAuth { service_name })
    }
}
