//! Badge unlock evaluation.

use std::collections::HashMap;

use gamify_core::{Action, AggregateMetric, Badge, BadgeSet, UnlockRule, UserId};

use crate::aggregates::AggregateCounter;

/// What the action being credited adds to aggregate counts.
///
/// The completion record is written in the same step as the badges, so the
/// stored counts do not include it yet when the rules are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingContribution {
    /// Correct quiz answers on the card being credited.
    pub correct_answers: u64,
    /// One if the action is a medication check.
    pub medication_checks: u64,
}

impl PendingContribution {
    /// The contribution of `action`.
    #[must_use]
    pub fn from_action(action: &Action) -> Self {
        Self {
            correct_answers: u64::from(action.correct_answers()),
            medication_checks: u64::from(matches!(action, Action::MedicationCheck { .. })),
        }
    }

    const fn for_metric(self, metric: AggregateMetric) -> u64 {
        match metric {
            AggregateMetric::CorrectQuizAnswers => self.correct_answers,
            AggregateMetric::MedicationChecks => self.medication_checks,
            AggregateMetric::ScamChecks | AggregateMetric::ReactionsReceived => 0,
        }
    }
}

/// Badges newly unlocked by the given totals.
///
/// Badges in `held` are skipped without querying anything. A failed aggregate
/// query counts as "not met" for that badge only.
pub async fn check_unlocks(
    aggregates: &dyn AggregateCounter,
    user_id: &UserId,
    held: &BadgeSet,
    total_points: u64,
    streak_days: u32,
    pending: PendingContribution,
) -> BadgeSet {
    let mut unlocked = BadgeSet::new();
    let mut counts: HashMap<AggregateMetric, Option<u64>> = HashMap::new();

    for badge in Badge::ALL {
        if held.contains(badge) {
            continue;
        }

        let met = match badge.rule() {
            UnlockRule::Points(threshold) => total_points >= threshold,
            UnlockRule::Streak(threshold) => streak_days >= threshold,
            UnlockRule::Aggregate(metric, threshold) => {
                let count = match counts.get(&metric) {
                    Some(count) => *count,
                    None => {
                        let count = match aggregates.count(user_id, metric).await {
                            Ok(count) => Some(count),
                            Err(e) => {
                                tracing::warn!(
                                    user_id = %user_id,
                                    badge = %badge,
                                    metric = %metric,
                                    error = %e,
                                    "Aggregate query failed, treating badge as not met"
                                );
                                None
                            }
                        };
                        counts.insert(metric, count);
                        count
                    }
                };
                count.is_some_and(|c| c.saturating_add(pending.for_metric(metric)) >= threshold)
            }
        };

        if met {
            unlocked.insert(badge);
        }
    }

    if !unlocked.is_empty() {
        tracing::debug!(user_id = %user_id, badges = ?unlocked.to_ids(), "Badges unlocked");
    }

    unlocked
}
