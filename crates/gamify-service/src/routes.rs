//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{awards, health, users};
use crate::state::AppState;

/// Maximum concurrent requests across `/v1` routes.
const API_MAX_CONCURRENT_REQUESTS: usize = 200;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Service API key auth
/// - `POST /v1/awards` - Credit an action (rate-limited per user)
/// - `GET /v1/users/:user_id/stats` - Stats view
/// - `GET /v1/users/:user_id/level-progress` - Level progress view
/// - `GET /v1/users/:user_id/badges` - Badge list
/// - `POST /v1/users/:user_id/activity` - Bump a cross-domain counter
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let user_routes = Router::new()
        .route("/:user_id/stats", get(users::get_stats))
        .route("/:user_id/level-progress", get(users::get_level_progress))
        .route("/:user_id/badges", get(users::get_badges))
        .route("/:user_id/activity", post(users::record_activity));

    let api_routes = Router::new()
        .route("/awards", post(awards::claim_award))
        .nest("/users", user_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
