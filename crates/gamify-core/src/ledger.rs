//! Ledger and completion records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::badge::BadgeSet;
use crate::ids::{TargetId, UserId};
use crate::level::level_for_points;

/// The durable per-user record of points, streak and badges.
///
/// A ledger is created lazily the first time a user is credited and is
/// never deleted by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLedger {
    /// The user this ledger belongs to.
    pub user_id: UserId,

    /// Cumulative points. Never decreases.
    pub total_points: u64,

    /// Consecutive active days ending at `last_activity_date`.
    pub current_streak: u32,

    /// Longest streak ever reached. Always `>= current_streak`.
    pub longest_streak: u32,

    /// Last credited calendar day. Unparseable stored values read as `None`.
    #[serde(default, deserialize_with = "crate::streak::lenient_date")]
    pub last_activity_date: Option<NaiveDate>,

    /// Unlocked badges.
    #[serde(default)]
    pub badges: BadgeSet,

    /// Optimistic-concurrency revision, bumped on every write.
    #[serde(default)]
    pub revision: u64,

    /// When the ledger was created.
    pub created_at: DateTime<Utc>,

    /// When the ledger was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserLedger {
    /// A fresh ledger with no activity.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            badges: BadgeSet::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Level derived from `total_points`.
    #[must_use]
    pub fn level(&self) -> u8 {
        level_for_points(self.total_points)
    }
}

/// Quiz grading attached to a learning-card completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    /// Correct answers.
    pub correct: u32,
    /// Questions asked.
    pub total: u32,
}

/// One credited action. Append-only.
///
/// `(user_id, target, day)` is unique across all records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// The credited user.
    pub user_id: UserId,
    /// What the action was performed on.
    pub target: TargetId,
    /// The calendar day the action was credited for.
    pub day: NaiveDate,
    /// Kind of action.
    pub kind: ActionKind,
    /// Quiz result, for learning cards that carried a quiz.
    pub score: Option<QuizScore>,
    /// Points granted by this credit.
    pub points_awarded: u64,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ledger_is_empty() {
        let ledger = UserLedger::new(UserId::generate());
        assert_eq!(ledger.total_points, 0);
        assert_eq!(ledger.current_streak, 0);
        assert!(ledger.last_activity_date.is_none());
        assert!(ledger.badges.is_empty());
        assert_eq!(ledger.level(), 1);
    }

    #[test]
    fn malformed_stored_date_reads_as_unset() {
        let ledger = UserLedger::new(UserId::generate());
        let mut value = serde_json::to_value(&ledger).unwrap();
        value["last_activity_date"] = serde_json::json!("31/02/2025");
        value["current_streak"] = serde_json::json!(4);

        let parsed: UserLedger = serde_json::from_value(value).unwrap();
        assert!(parsed.last_activity_date.is_none());
        assert_eq!(parsed.current_streak, 4);
    }

    #[test]
    fn stored_date_roundtrips() {
        let mut ledger = UserLedger::new(UserId::generate());
        ledger.last_activity_date = NaiveDate::from_ymd_opt(2025, 1, 10);
        let json = serde_json::to_string(&ledger).unwrap();
        let parsed: UserLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.last_activity_date, ledger.last_activity_date);
    }

    #[test]
    fn missing_optional_fields_default() {
        let user_id = UserId::generate();
        let now = Utc::now();
        let value = serde_json::json!({
            "user_id": user_id.to_string(),
            "total_points": 12,
            "current_streak": 1,
            "longest_streak": 1,
            "created_at": now,
            "updated_at": now,
        });
        let parsed: UserLedger = serde_json::from_value(value).unwrap();
        assert!(parsed.last_activity_date.is_none());
        assert!(parsed.badges.is_empty());
        assert_eq!(parsed.revision, 0);
    }
}
