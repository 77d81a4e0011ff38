//! Points, streak and level for a single credited action.
//!
//! Everything here is pure: the caller supplies the ledger it read and gets
//! back the ledger it should write.

use chrono::NaiveDate;

use gamify_core::{
    level_for_points, next_streak, points_for, Action, StreakUpdate, UserLedger,
};

/// Effects of crediting one action, before badges are evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    /// Points earned by this action.
    pub points_added: u64,
    /// How the streak moved.
    pub streak: StreakUpdate,
    /// Level before the action.
    pub old_level: u8,
    /// Level after the action.
    pub new_level: u8,
    /// The ledger with points, streak and last activity date applied.
    /// Badges and revision are carried over unchanged.
    pub ledger: UserLedger,
}

impl Award {
    /// Whether this action crossed a level threshold.
    #[must_use]
    pub const fn level_up(&self) -> bool {
        self.new_level > self.old_level
    }
}

/// Apply `action`, credited for `day`, to `ledger`.
#[must_use]
pub fn apply(ledger: &UserLedger, action: &Action, day: NaiveDate) -> Award {
    let streak = next_streak(ledger.last_activity_date, ledger.current_streak, day);
    let points_added = points_for(action, streak.change);

    let mut next = ledger.clone();
    next.total_points = ledger.total_points.saturating_add(points_added);
    next.current_streak = streak.current;
    next.longest_streak = ledger.longest_streak.max(streak.current);
    next.last_activity_date = Some(ledger.last_activity_date.map_or(day, |last| last.max(day)));

    Award {
        points_added,
        streak,
        old_level: level_for_points(ledger.total_points),
        new_level: level_for_points(next.total_points),
        ledger: next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamify_core::{StreakChange, UserId};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn card(correct: u32) -> Action {
        Action::LearningCard {
            card_id: "c1".into(),
            correct_answers: correct,
            total_questions: 3,
        }
    }

    fn ledger(points: u64, streak: u32, last: Option<NaiveDate>) -> UserLedger {
        let mut ledger = UserLedger::new(UserId::generate());
        ledger.total_points = points;
        ledger.current_streak = streak;
        ledger.longest_streak = streak;
        ledger.last_activity_date = last;
        ledger
    }

    #[test]
    fn first_card_earns_base_answers_and_bonus() {
        let award = apply(&ledger(0, 0, None), &card(2), day(10));
        assert_eq!(award.points_added, 5 + 4 + 3);
        assert_eq!(award.streak.change, StreakChange::Started);
        assert_eq!(award.ledger.current_streak, 1);
        assert_eq!(award.ledger.longest_streak, 1);
        assert_eq!(award.ledger.last_activity_date, Some(day(10)));
    }

    #[test]
    fn continued_streak() {
        let award = apply(&ledger(50, 4, Some(day(9))), &card(0), day(10));
        assert_eq!(award.ledger.current_streak, 5);
        assert_eq!(award.points_added, 5 + 3);
        assert_eq!(award.ledger.total_points, 58);
    }

    #[test]
    fn same_day_keeps_streak_and_skips_bonus() {
        let award = apply(&ledger(50, 4, Some(day(10))), &card(1), day(10));
        assert_eq!(award.ledger.current_streak, 4);
        assert_eq!(award.points_added, 5 + 2);
    }

    #[test]
    fn gap_resets_streak_but_keeps_longest() {
        let award = apply(&ledger(50, 8, Some(day(5))), &card(0), day(10));
        assert_eq!(award.streak.change, StreakChange::Reset);
        assert_eq!(award.ledger.current_streak, 1);
        assert_eq!(award.ledger.longest_streak, 8);
    }

    #[test]
    fn backdated_credit_never_moves_last_date_back() {
        let award = apply(
            &ledger(50, 3, Some(day(10))),
            &Action::MedicationCheck {
                medication_id: "m1".into(),
            },
            day(8),
        );
        assert_eq!(award.streak.change, StreakChange::Backdated);
        assert_eq!(award.ledger.current_streak, 3);
        assert_eq!(award.ledger.last_activity_date, Some(day(10)));
        assert_eq!(award.points_added, 2);
    }

    #[test]
    fn level_up_detected_at_threshold() {
        let award = apply(&ledger(95, 0, None), &card(0), day(10));
        assert_eq!(award.ledger.total_points, 103);
        assert_eq!(award.old_level, 1);
        assert_eq!(award.new_level, 2);
        assert!(award.level_up());

        let award = apply(&ledger(10, 0, None), &card(0), day(10));
        assert!(!award.level_up());
    }

    #[test]
    fn revision_and_badges_carried_over() {
        let mut before = ledger(0, 0, None);
        before.revision = 7;
        before.badges.insert(gamify_core::Badge::FirstStep);
        let award = apply(&before, &card(0), day(10));
        assert_eq!(award.ledger.revision, 7);
        assert_eq!(award.ledger.badges, before.badges);
    }
}
