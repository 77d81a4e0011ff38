//! Flat point table.

use crate::action::Action;
use crate::streak::StreakChange;

/// Points for completing a learning card.
pub const BASE_CARD_POINTS: u64 = 5;

/// Points per correctly answered quiz question.
pub const CORRECT_ANSWER_POINTS: u64 = 2;

/// Bonus for a card completion that starts, continues or restarts a streak.
pub const DAILY_STREAK_BONUS: u64 = 3;

/// Points for a medication check.
pub const MED_CHECK_POINTS: u64 = 2;

/// Points for finishing a tool tutorial step.
pub const TOOL_STEP_POINTS: u64 = 3;

/// Points for publishing a community post.
pub const COMMUNITY_POST_POINTS: u64 = 3;

/// Points for voting on a community post.
pub const COMMUNITY_VOTE_POINTS: u64 = 1;

/// Points earned by `action` given the streak transition it caused.
///
/// Only learning cards earn the streak bonus, and only when the streak
/// actually moved (a same-day repeat or a back-dated credit earns none).
#[must_use]
pub fn points_for(action: &Action, streak: StreakChange) -> u64 {
    match action {
        Action::LearningCard {
            correct_answers, ..
        } => {
            let bonus = if streak.earns_bonus() {
                DAILY_STREAK_BONUS
            } else {
                0
            };
            BASE_CARD_POINTS + u64::from(*correct_answers) * CORRECT_ANSWER_POINTS + bonus
        }
        Action::MedicationCheck { .. } => MED_CHECK_POINTS,
        Action::ToolStep { .. } => TOOL_STEP_POINTS,
        Action::CommunityPost { .. } => COMMUNITY_POST_POINTS,
        Action::CommunityVote { .. } => COMMUNITY_VOTE_POINTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(correct: u32) -> Action {
        Action::LearningCard {
            card_id: "c".into(),
            correct_answers: correct,
            total_questions: 3,
        }
    }

    #[test]
    fn card_points_include_quiz_and_streak_bonus() {
        assert_eq!(points_for(&card(2), StreakChange::Continued), 5 + 4 + 3);
        assert_eq!(points_for(&card(0), StreakChange::Started), 5 + 3);
        assert_eq!(points_for(&card(1), StreakChange::Reset), 5 + 2 + 3);
    }

    #[test]
    fn no_streak_bonus_without_streak_movement() {
        assert_eq!(points_for(&card(2), StreakChange::SameDay), 9);
        assert_eq!(points_for(&card(2), StreakChange::Backdated), 9);
    }

    #[test]
    fn flat_actions_ignore_streak() {
        let med = Action::MedicationCheck {
            medication_id: "m".into(),
        };
        let tool = Action::ToolStep {
            tool: "canva".into(),
            step: 1,
        };
        assert_eq!(points_for(&med, StreakChange::Continued), MED_CHECK_POINTS);
        assert_eq!(points_for(&tool, StreakChange::Started), TOOL_STEP_POINTS);
        assert_eq!(
            points_for(&Action::CommunityVote { post_id: "p".into() }, StreakChange::SameDay),
            COMMUNITY_VOTE_POINTS
        );
    }
}
