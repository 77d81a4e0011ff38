//! The engine facade used by calling routes.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use gamify_cache::Cache;
use gamify_core::{
    Action, ActionKind, AggregateMetric, Badge, BadgeSet, CompletionRecord, LevelProgress,
    QuizScore, UserId,
};
use gamify_store::{CommitOutcome, CountQuery, Store};

use crate::accounting;
use crate::aggregates::AggregateCounter;
use crate::badges::{check_unlocks, PendingContribution};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::guard::{GuardCheck, IdempotencyGuard};
use crate::projection::{Projection, View};

/// Effects of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardResult {
    /// Points earned by this action.
    pub points_added: u64,
    /// Cumulative points after the action.
    pub total_points: u64,
    /// Current streak after the action.
    pub streak_days: u32,
    /// Level after the action.
    pub level: u8,
    /// Whether the action crossed a level threshold.
    pub level_up: bool,
    /// Badges unlocked by this action.
    pub new_badges: Vec<Badge>,
}

/// Outcome of [`GamificationEngine::claim_and_award`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The action was credited.
    Awarded(AwardResult),
    /// The action had already been credited for that day. Nothing changed.
    AlreadyCredited,
}

/// Stats view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// Cumulative points.
    pub total_points: u64,
    /// Current level.
    pub level: u8,
    /// Current streak.
    pub current_streak: u32,
    /// Longest streak ever.
    pub longest_streak: u32,
    /// Unlocked badges.
    pub badges: BadgeSet,
    /// Learning cards credited.
    pub cards_completed: u64,
    /// Correct quiz answers across all cards.
    pub quizzes_correct: u64,
}

/// Gamification engine.
///
/// Holds no locks of its own. Concurrent claims for one user are reconciled
/// by the store's revision check and retried here.
pub struct GamificationEngine {
    store: Arc<dyn Store>,
    aggregates: Arc<dyn AggregateCounter>,
    guard: IdempotencyGuard,
    projection: Projection,
    config: EngineConfig,
}

impl GamificationEngine {
    /// Create an engine over explicit store, cache and aggregate handles.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn Cache>,
        aggregates: Arc<dyn AggregateCounter>,
        config: EngineConfig,
    ) -> Self {
        let guard = IdempotencyGuard::new(store.clone(), cache.clone(), config.claim_marker_ttl);
        let projection = Projection::new(cache, config.view_ttls);
        Self {
            store,
            aggregates,
            guard,
            projection,
            config,
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Credit `action` for `day`, at most once per `(user, target, day)`.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidAction` if the payload is inconsistent.
    /// - `EngineError::Store` if the store fails. Nothing was credited.
    /// - `EngineError::Contention` if the ledger kept moving during every attempt.
    pub async fn claim_and_award(
        &self,
        user_id: &UserId,
        action: &Action,
        day: NaiveDate,
    ) -> Result<ClaimOutcome> {
        action.validate()?;
        let target = action.target()?;

        if self.guard.check(user_id, &target, day).await? == GuardCheck::AlreadyClaimed {
            tracing::debug!(user_id = %user_id, target = %target, %day, "Already credited");
            return Ok(ClaimOutcome::AlreadyCredited);
        }

        let pending = PendingContribution::from_action(action);
        let attempts = self.config.max_commit_attempts.max(1);

        for attempt in 1..=attempts {
            let ledger = self.store.get_or_create_ledger(user_id).await?;
            let award = accounting::apply(&ledger, action, day);

            let new_badges = check_unlocks(
                self.aggregates.as_ref(),
                user_id,
                &ledger.badges,
                award.ledger.total_points,
                award.ledger.current_streak,
                pending,
            )
            .await;

            let mut next = award.ledger.clone();
            next.badges = next.badges.union(&new_badges);

            let record = CompletionRecord {
                user_id: *user_id,
                target: target.clone(),
                day,
                kind: action.kind(),
                score: quiz_score(action),
                points_awarded: award.points_added,
                recorded_at: chrono::Utc::now(),
            };

            match self.store.commit_claim(&record, &next, ledger.revision).await? {
                CommitOutcome::Committed(stored) => {
                    self.guard.mark_claimed(user_id, &target, day).await;
                    self.projection.invalidate(user_id).await;

                    tracing::info!(
                        user_id = %user_id,
                        target = %target,
                        %day,
                        points_added = award.points_added,
                        total_points = stored.total_points,
                        streak = stored.current_streak,
                        new_badges = new_badges.len(),
                        "Action credited"
                    );

                    return Ok(ClaimOutcome::Awarded(AwardResult {
                        points_added: award.points_added,
                        total_points: stored.total_points,
                        streak_days: stored.current_streak,
                        level: stored.level(),
                        level_up: award.level_up(),
                        new_badges: new_badges.iter().collect(),
                    }));
                }
                CommitOutcome::Duplicate => {
                    tracing::debug!(
                        user_id = %user_id,
                        target = %target,
                        %day,
                        "Lost claim race, already credited"
                    );
                    self.guard.mark_claimed(user_id, &target, day).await;
                    return Ok(ClaimOutcome::AlreadyCredited);
                }
                CommitOutcome::Conflict => {
                    if attempt < attempts {
                        let delay = self.config.commit_backoff(attempt);
                        tracing::debug!(
                            user_id = %user_id,
                            attempt,
                            backoff_us = delay.as_micros(),
                            "Ledger revision moved, recomputing claim"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::warn!(user_id = %user_id, attempts, "Giving up on contended ledger");
        Err(EngineError::Contention {
            user_id: *user_id,
            attempts,
        })
    }

    /// Add to a cross-domain activity counter (scam checks, reactions received).
    ///
    /// Counters only gate aggregate badges; they are evaluated on the user's
    /// next credited action.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the store fails.
    pub async fn record_activity(
        &self,
        user_id: &UserId,
        metric: AggregateMetric,
        amount: u64,
    ) -> Result<u64> {
        let total = self.store.record_activity(user_id, metric, amount).await?;
        tracing::debug!(user_id = %user_id, metric = %metric, amount, total, "Activity recorded");
        Ok(total)
    }

    // =========================================================================
    // Cached Reads
    // =========================================================================

    /// Stats view of a user.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the view is not cached and the store fails.
    pub async fn get_stats(&self, user_id: &UserId) -> Result<UserStats> {
        self.projection
            .get_or_compute(View::Stats, user_id, || async {
                let ledger = self.store.get_or_create_ledger(user_id).await?;
                let cards_completed = self
                    .store
                    .count_matching(user_id, CountQuery::Completions(Some(ActionKind::LearningCard)))
                    .await?;
                let quizzes_correct = self
                    .store
                    .count_matching(user_id, CountQuery::CorrectQuizAnswers)
                    .await?;

                Ok::<_, EngineError>(UserStats {
                    total_points: ledger.total_points,
                    level: ledger.level(),
                    current_streak: ledger.current_streak,
                    longest_streak: ledger.longest_streak,
                    badges: ledger.badges,
                    cards_completed,
                    quizzes_correct,
                })
            })
            .await
    }

    /// Level progress of a user.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the view is not cached and the store fails.
    pub async fn get_level_progress(&self, user_id: &UserId) -> Result<LevelProgress> {
        self.projection
            .get_or_compute(View::Level, user_id, || async {
                let ledger = self.store.get_or_create_ledger(user_id).await?;
                Ok::<_, EngineError>(LevelProgress::from_points(ledger.total_points))
            })
            .await
    }

    /// Badges a user holds.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the view is not cached and the store fails.
    pub async fn get_badges(&self, user_id: &UserId) -> Result<BadgeSet> {
        self.projection
            .get_or_compute(View::Badges, user_id, || async {
                let ledger = self.store.get_or_create_ledger(user_id).await?;
                Ok::<_, EngineError>(ledger.badges)
            })
            .await
    }
}

fn quiz_score(action: &Action) -> Option<QuizScore> {
    match action {
        Action::LearningCard {
            correct_answers,
            total_questions,
            ..
        } if *total_questions > 0 => Some(QuizScore {
            correct: *correct_answers,
            total: *total_questions,
        }),
        _ => None,
    }
}
