//! Badges and their unlock rules.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GamifyError;

/// A one-way unlockable achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Badge {
    /// First points earned (5 points).
    #[serde(rename = "first_step")]
    FirstStep,
    /// 100 points.
    #[serde(rename = "points_100")]
    Points100,
    /// 500 points.
    #[serde(rename = "points_500")]
    Points500,
    /// 1000 points.
    #[serde(rename = "points_1000")]
    Points1000,
    /// 7-day streak.
    #[serde(rename = "week_streak")]
    WeekStreak,
    /// 30-day streak.
    #[serde(rename = "month_streak")]
    MonthStreak,
    /// 50 correct quiz answers.
    #[serde(rename = "quiz_master")]
    QuizMaster,
    /// 10 scam checks.
    #[serde(rename = "scam_guardian")]
    ScamGuardian,
    /// 30 medication checks.
    #[serde(rename = "safety_keeper")]
    SafetyKeeper,
    /// 10 reactions received on own posts.
    #[serde(rename = "community_star")]
    CommunityStar,
}

/// Condition that unlocks a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockRule {
    /// Cumulative points reach the threshold.
    Points(u64),
    /// Current streak reaches the threshold.
    Streak(u32),
    /// A cross-domain count reaches the threshold.
    Aggregate(AggregateMetric, u64),
}

impl Badge {
    /// Every badge, in evaluation order.
    pub const ALL: [Self; 10] = [
        Self::FirstStep,
        Self::Points100,
        Self::Points500,
        Self::Points1000,
        Self::WeekStreak,
        Self::MonthStreak,
        Self::QuizMaster,
        Self::ScamGuardian,
        Self::SafetyKeeper,
        Self::CommunityStar,
    ];

    /// The rule that unlocks this badge.
    #[must_use]
    pub const fn rule(self) -> UnlockRule {
        match self {
            Self::FirstStep => UnlockRule::Points(5),
            Self::Points100 => UnlockRule::Points(100),
            Self::Points500 => UnlockRule::Points(500),
            Self::Points1000 => UnlockRule::Points(1000),
            Self::WeekStreak => UnlockRule::Streak(7),
            Self::MonthStreak => UnlockRule::Streak(30),
            Self::QuizMaster => UnlockRule::Aggregate(AggregateMetric::CorrectQuizAnswers, 50),
            Self::ScamGuardian => UnlockRule::Aggregate(AggregateMetric::ScamChecks, 10),
            Self::SafetyKeeper => UnlockRule::Aggregate(AggregateMetric::MedicationChecks, 30),
            Self::CommunityStar => UnlockRule::Aggregate(AggregateMetric::ReactionsReceived, 10),
        }
    }

    /// Stable badge identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstStep => "first_step",
            Self::Points100 => "points_100",
            Self::Points500 => "points_500",
            Self::Points1000 => "points_1000",
            Self::WeekStreak => "week_streak",
            Self::MonthStreak => "month_streak",
            Self::QuizMaster => "quiz_master",
            Self::ScamGuardian => "scam_guardian",
            Self::SafetyKeeper => "safety_keeper",
            Self::CommunityStar => "community_star",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = GamifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| GamifyError::UnknownBadge(s.to_string()))
    }
}

/// Counts owned by other domains that gate aggregate badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateMetric {
    /// Cumulative correct quiz answers across completed cards.
    CorrectQuizAnswers,
    /// Cumulative scam-check requests.
    ScamChecks,
    /// Cumulative medication checks.
    MedicationChecks,
    /// Cumulative reactions received on the user's own posts.
    ReactionsReceived,
}

impl AggregateMetric {
    /// Get the metric name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CorrectQuizAnswers => "correct_quiz_answers",
            Self::ScamChecks => "scam_checks",
            Self::MedicationChecks => "medication_checks",
            Self::ReactionsReceived => "reactions_received",
        }
    }
}

impl fmt::Display for AggregateMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateMetric {
    type Err = GamifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correct_quiz_answers" => Ok(Self::CorrectQuizAnswers),
            "scam_checks" => Ok(Self::ScamChecks),
            "medication_checks" => Ok(Self::MedicationChecks),
            "reactions_received" => Ok(Self::ReactionsReceived),
            other => Err(GamifyError::UnknownMetric(other.to_string())),
        }
    }
}

/// The set of badges a user holds.
///
/// Badges are only ever added; there is no removal API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeSet(BTreeSet<Badge>);

impl BadgeSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the badge is held.
    #[must_use]
    pub fn contains(&self, badge: Badge) -> bool {
        self.0.contains(&badge)
    }

    /// Add a badge; returns `true` if it was not held before.
    pub fn insert(&mut self, badge: Badge) -> bool {
        self.0.insert(badge)
    }

    /// Badges in `self` or `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// Badges in `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).copied().collect())
    }

    /// Number of badges held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no badge is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in stable order.
    pub fn iter(&self) -> impl Iterator<Item = Badge> + '_ {
        self.0.iter().copied()
    }

    /// Badge ids as strings, in stable order.
    #[must_use]
    pub fn to_ids(&self) -> Vec<String> {
        self.iter().map(|b| b.as_str().to_string()).collect()
    }
}

impl FromIterator<Badge> for BadgeSet {
    fn from_iter<I: IntoIterator<Item = Badge>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for BadgeSet {
    type Item = Badge;
    type IntoIter = std::collections::btree_set::IntoIter<Badge>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
