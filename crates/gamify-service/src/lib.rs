//! Gamify HTTP API Service.
//!
//! Exposes the gamification engine to the routes that own user-facing
//! traffic:
//!
//! - Awarding points for completed actions
//! - Per-user stats, level progress and badge views
//! - Cross-domain activity counters (scam checks, reactions received)
//!
//! # Authentication
//!
//! Every `/v1` route requires the shared service API key in `X-API-Key`.
//! End users are authenticated upstream by the calling route.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Health handler is async for the router

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{ServiceConfig, StoreBackend};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
