//! Per-user read views and activity ingestion.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use gamify_core::{AggregateMetric, BadgeSet, LevelProgress, UserId};
use gamify_engine::UserStats;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))
}

/// Get a user's stats.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
) -> Result<Json<UserStats>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.engine.get_stats(&user_id).await?))
}

/// Get a user's level progress.
pub async fn get_level_progress(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
) -> Result<Json<LevelProgress>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.engine.get_level_progress(&user_id).await?))
}

/// Badge list response.
#[derive(Debug, Serialize)]
pub struct BadgesResponse {
    /// Unlocked badge IDs.
    pub badges: BadgeSet,
}

/// Get a user's badges.
pub async fn get_badges(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(user_id): Path<String>,
) -> Result<Json<BadgesResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let badges = state.engine.get_badges(&user_id).await?;
    Ok(Json(BadgesResponse { badges }))
}

/// Activity recorded by another domain.
#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    /// Which counter to bump.
    pub metric: AggregateMetric,
    /// Amount to add (default: 1).
    #[serde(default = "default_amount")]
    pub amount: u64,
}

const fn default_amount() -> u64 {
    1
}

/// Activity response.
#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    /// The counter that was bumped.
    pub metric: AggregateMetric,
    /// Counter value after the update.
    pub total: u64,
}

/// Record a cross-domain activity (scam check, reaction received).
pub async fn record_activity(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Path(user_id): Path<String>,
    Json(body): Json<ActivityRequest>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    match body.metric {
        AggregateMetric::ScamChecks | AggregateMetric::ReactionsReceived => {}
        AggregateMetric::CorrectQuizAnswers | AggregateMetric::MedicationChecks => {
            return Err(ApiError::BadRequest(format!(
                "{} is derived from credited actions",
                body.metric
            )));
        }
    }

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        metric = %body.metric,
        amount = body.amount,
        "Recording activity"
    );

    let total = state
        .engine
        .record_activity(&user_id, body.metric, body.amount)
        .await?;

    Ok(Json(ActivityResponse {
        metric: body.metric,
        total,
    }))
}
