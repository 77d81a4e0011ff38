//! Core types and rules for the gamification ledger.
//!
//! This crate holds everything that can be decided without touching a store:
//!
//! - **Identifiers**: `UserId`, `TargetId`
//! - **Actions**: `Action`, `ActionKind`, and the flat point table
//! - **Ledger**: `UserLedger`, `CompletionRecord`, `QuizScore`
//! - **Streaks**: the pure `next_streak` date arithmetic
//! - **Levels**: `level_for_points`, `LevelProgress`
//! - **Badges**: `Badge`, `BadgeSet`, `UnlockRule`, `AggregateMetric`
//!
//! # Points
//!
//! Points are stored as `u64` and only ever grow. Levels are never stored;
//! they are recomputed from `total_points` whenever needed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod badge;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod level;
pub mod points;
pub mod streak;

pub use action::{Action, ActionKind};
pub use badge::{AggregateMetric, Badge, BadgeSet, UnlockRule};
pub use error::{GamifyError, Result};
pub use ids::{IdError, TargetId, UserId};
pub use ledger::{CompletionRecord, QuizScore, UserLedger};
pub use level::{level_for_points, LevelProgress, LEVEL_THRESHOLDS, MAX_LEVEL};
pub use points::{
    points_for, BASE_CARD_POINTS, COMMUNITY_POST_POINTS, COMMUNITY_VOTE_POINTS,
    CORRECT_ANSWER_POINTS, DAILY_STREAK_BONUS, MED_CHECK_POINTS, TOOL_STEP_POINTS,
};
pub use streak::{next_streak, parse_activity_date, StreakChange, StreakUpdate};
