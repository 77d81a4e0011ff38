//! Award handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use gamify_core::{Action, Badge, UserId};
use gamify_engine::ClaimOutcome;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Award request from a calling route.
#[derive(Debug, Deserialize)]
pub struct AwardRequest {
    /// User being credited.
    pub user_id: String,
    /// The action and its payload.
    pub action: Action,
    /// Calendar day to credit (`YYYY-MM-DD`). Defaults to today in the
    /// configured activity timezone.
    #[serde(default)]
    pub day: Option<String>,
}

/// Award response.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AwardResponse {
    /// The action was credited.
    Awarded {
        /// Points earned by this action.
        points_added: u64,
        /// Cumulative points.
        total_points: u64,
        /// Current streak.
        streak_days: u32,
        /// Current level.
        level: u8,
        /// Whether this action crossed a level threshold.
        level_up: bool,
        /// Badges unlocked by this action.
        new_badges: Vec<Badge>,
    },
    /// The action had already been credited for that day.
    AlreadyCredited {
        /// Always zero.
        points_added: u64,
    },
}

impl From<ClaimOutcome> for AwardResponse {
    fn from(outcome: ClaimOutcome) -> Self {
        match outcome {
            ClaimOutcome::Awarded(award) => Self::Awarded {
                points_added: award.points_added,
                total_points: award.total_points,
                streak_days: award.streak_days,
                level: award.level,
                level_up: award.level_up,
                new_badges: award.new_badges,
            },
            ClaimOutcome::AlreadyCredited => Self::AlreadyCredited { points_added: 0 },
        }
    }
}

/// Credit an action to a user, at most once per target and day.
pub async fn claim_award(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<AwardRequest>,
) -> Result<Json<AwardResponse>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let day = match body.day.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("Invalid day: {raw}")))?,
        None => state.config.today(),
    };

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        action = body.action.kind().as_str(),
        %day,
        "Processing award"
    );

    check_rate_limit(&state, &user_id).await?;

    let outcome = state
        .engine
        .claim_and_award(&user_id, &body.action, day)
        .await?;

    Ok(Json(outcome.into()))
}

/// Fixed-window per-user limit. Cache failures let the request through.
async fn check_rate_limit(state: &AppState, user_id: &UserId) -> Result<(), ApiError> {
    let limit = state.config.claim_rate_limit_per_minute;
    if limit == 0 {
        return Ok(());
    }

    let key = format!("ratelimit:claims:{user_id}");
    match state
        .cache
        .increment_with_expiry(&key, RATE_LIMIT_WINDOW)
        .await
    {
        Ok(count) if count > limit => {
            tracing::warn!(user_id = %user_id, count, limit, "Claim rate limit exceeded");
            Err(ApiError::RateLimited {
                retry_after_secs: RATE_LIMIT_WINDOW.as_secs(),
            })
        }
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Rate limit check failed, allowing");
            Ok(())
        }
    }
}
