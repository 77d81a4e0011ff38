//! Level derivation.
//!
//! Levels are a step function of cumulative points with half-open tiers:
//! a user is at level `n` when `points >= LEVEL_THRESHOLDS[n - 1]` and below
//! the next threshold.

use serde::{Deserialize, Serialize};

/// Minimum points for levels 1 through 5.
pub const LEVEL_THRESHOLDS: [u64; 5] = [0, 100, 300, 600, 1000];

/// Highest reachable level.
pub const MAX_LEVEL: u8 = 5;

/// Level for a point total.
#[must_use]
pub fn level_for_points(points: u64) -> u8 {
    let reached = LEVEL_THRESHOLDS.iter().filter(|&&t| points >= t).count();
    u8::try_from(reached).unwrap_or(MAX_LEVEL)
}

/// Progress towards the next level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level.
    pub current_level: u8,
    /// Current point total.
    pub current_points: u64,
    /// Next level, or `None` at the top level.
    pub next_level: Option<u8>,
    /// Points required for the next level, or `None` at the top level.
    pub next_level_threshold: Option<u64>,
    /// Progress through the current tier, 0 to 100.
    pub progress_percentage: u8,
    /// Points still missing for the next level (zero at the top level).
    pub points_needed: u64,
}

impl LevelProgress {
    /// Compute progress from a point total.
    #[must_use]
    pub fn from_points(points: u64) -> Self {
        let level = level_for_points(points);
        let floor = LEVEL_THRESHOLDS[usize::from(level) - 1];

        let Some(&ceiling) = LEVEL_THRESHOLDS.get(usize::from(level)) else {
            return Self {
                current_level: level,
                current_points: points,
                next_level: None,
                next_level_threshold: None,
                progress_percentage: 100,
                points_needed: 0,
            };
        };

        let span = ceiling - floor;
        let pct = (points - floor) * 100 / span;

        Self {
            current_level: level,
            current_points: points,
            next_level: Some(level + 1),
            next_level_threshold: Some(ceiling),
            progress_percentage: u8::try_from(pct).unwrap_or(100),
            points_needed: ceiling - points,
        }
    }
}
