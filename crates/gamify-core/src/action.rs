//! User actions that can earn points.

use serde::{Deserialize, Serialize};

use crate::error::{GamifyError, Result};
use crate::ids::TargetId;

/// A creditable user action together with its payload.
///
/// Each action names its own target, so the uniqueness key of a credit is
/// derived from the action rather than supplied separately by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// A learning card was completed, optionally with a graded quiz.
    LearningCard {
        /// Card identifier.
        card_id: String,
        /// Number of correctly answered quiz questions.
        #[serde(default)]
        correct_answers: u32,
        /// Number of quiz questions on the card.
        #[serde(default)]
        total_questions: u32,
    },

    /// A scheduled medication was checked off.
    MedicationCheck {
        /// Medication schedule identifier.
        medication_id: String,
    },

    /// A step of a tool tutorial was finished.
    ToolStep {
        /// Tool name (e.g. `canva`).
        tool: String,
        /// Step number within the tutorial.
        step: u32,
    },

    /// The user published a community post.
    CommunityPost {
        /// Post identifier.
        post_id: String,
    },

    /// The user voted on a community post.
    CommunityVote {
        /// Post identifier.
        post_id: String,
    },
}

impl Action {
    /// The kind of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::LearningCard { .. } => ActionKind::LearningCard,
            Self::MedicationCheck { .. } => ActionKind::MedicationCheck,
            Self::ToolStep { .. } => ActionKind::ToolStep,
            Self::CommunityPost { .. } => ActionKind::CommunityPost,
            Self::CommunityVote { .. } => ActionKind::CommunityVote,
        }
    }

    /// The target this action is credited against.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded identifiers do not form a valid target.
    pub fn target(&self) -> Result<TargetId> {
        let target = match self {
            Self::LearningCard { card_id, .. } => TargetId::card(card_id)?,
            Self::MedicationCheck { medication_id } => TargetId::medication(medication_id)?,
            Self::ToolStep { tool, step } => TargetId::tool_step(tool, *step)?,
            Self::CommunityPost { post_id } => TargetId::post(post_id)?,
            Self::CommunityVote { post_id } => TargetId::vote(post_id)?,
        };
        Ok(target)
    }

    /// Correct quiz answers carried by this action (zero for non-card actions).
    #[must_use]
    pub const fn correct_answers(&self) -> u32 {
        match self {
            Self::LearningCard {
                correct_answers, ..
            } => *correct_answers,
            _ => 0,
        }
    }

    /// Check the payload for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `GamifyError::InvalidAction` if a card reports more correct
    /// answers than questions, or `GamifyError::InvalidId` if the target is invalid.
    pub fn validate(&self) -> Result<()> {
        if let Self::LearningCard {
            correct_answers,
            total_questions,
            ..
        } = self
        {
            if correct_answers > total_questions {
                return Err(GamifyError::InvalidAction(format!(
                    "correct_answers ({correct_answers}) exceeds total_questions ({total_questions})"
                )));
            }
        }
        self.target().map(|_| ())
    }
}

/// The kind of a credited action, stored on completion records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Learning card completion.
    LearningCard,
    /// Medication check.
    MedicationCheck,
    /// Tool tutorial step.
    ToolStep,
    /// Community post.
    CommunityPost,
    /// Community vote.
    CommunityVote,
}

impl ActionKind {
    /// Get the kind name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LearningCard => "learning_card",
            Self::MedicationCheck => "medication_check",
            Self::ToolStep => "tool_step",
            Self::CommunityPost => "community_post",
            Self::CommunityVote => "community_vote",
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = GamifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "learning_card" => Ok(Self::LearningCard),
            "medication_check" => Ok(Self::MedicationCheck),
            "tool_step" => Ok(Self::ToolStep),
            "community_post" => Ok(Self::CommunityPost),
            "community_vote" => Ok(Self::CommunityVote),
            other => Err(GamifyError::InvalidAction(format!("unknown action kind: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_json_shape() {
        let action: Action = serde_json::from_value(serde_json::json!({
            "type": "learning_card",
            "card_id": "c1",
            "correct_answers": 2,
            "total_questions": 3
        }))
        .unwrap();
        assert_eq!(action.kind(), ActionKind::LearningCard);
        assert_eq!(action.correct_answers(), 2);
        assert_eq!(action.target().unwrap().as_str(), "card/c1");
    }

    #[test]
    fn card_without_quiz_defaults_to_zero() {
        let action: Action =
            serde_json::from_value(serde_json::json!({"type": "learning_card", "card_id": "c1"}))
                .unwrap();
        assert_eq!(action.correct_answers(), 0);
        assert!(action.validate().is_ok());
    }

    #[test]
    fn more_correct_than_total_is_rejected() {
        let action = Action::LearningCard {
            card_id: "c1".into(),
            correct_answers: 4,
            total_questions: 3,
        };
        assert!(matches!(action.validate(), Err(GamifyError::InvalidAction(_))));
    }

    #[test]
    fn empty_ids_are_rejected() {
        let action = Action::CommunityPost {
            post_id: String::new(),
        };
        assert!(matches!(action.validate(), Err(GamifyError::InvalidId(_))));
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in [
            ActionKind::LearningCard,
            ActionKind::MedicationCheck,
            ActionKind::ToolStep,
            ActionKind::CommunityPost,
            ActionKind::CommunityVote,
        ] {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }
}
