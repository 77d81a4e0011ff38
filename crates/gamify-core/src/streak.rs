//! Consecutive-day streak arithmetic.
//!
//! The streak is a pure function of the last credited day, the current streak
//! length and the day being credited. Nothing here touches a clock.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// How the streak moved for one credited day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First recorded activity.
    Started,
    /// Activity on the day after the last one.
    Continued,
    /// Another activity on the last active day.
    SameDay,
    /// Activity credited for a day before the last one.
    Backdated,
    /// A gap of two or more days broke the streak.
    Reset,
}

impl StreakChange {
    /// Whether this transition produced a new or continued streak.
    #[must_use]
    pub const fn earns_bonus(self) -> bool {
        matches!(self, Self::Started | Self::Continued | Self::Reset)
    }
}

/// Result of applying one credited day to a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    /// Streak length after the update.
    pub current: u32,
    /// How the streak moved.
    pub change: StreakChange,
}

/// Compute the streak after crediting `day`.
///
/// A ledger that claims a last activity date but a zero streak is treated as
/// having no prior activity.
#[must_use]
pub fn next_streak(last: Option<NaiveDate>, current: u32, day: NaiveDate) -> StreakUpdate {
    let Some(last) = last.filter(|_| current > 0) else {
        return StreakUpdate {
            current: 1,
            change: StreakChange::Started,
        };
    };

    match day.signed_duration_since(last).num_days() {
        1 => StreakUpdate {
            current: current.saturating_add(1),
            change: StreakChange::Continued,
        },
        0 => StreakUpdate {
            current,
            change: StreakChange::SameDay,
        },
        d if d < 0 => StreakUpdate {
            current,
            change: StreakChange::Backdated,
        },
        _ => StreakUpdate {
            current: 1,
            change: StreakChange::Reset,
        },
    }
}

/// Parse a stored `YYYY-MM-DD` activity date, failing safe to `None`.
#[must_use]
pub fn parse_activity_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Serde helper: reads an optional activity date, mapping anything
/// unparseable to `None` instead of failing the whole record.
pub(crate) fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_activity_date(&s),
        _ => None,
    })
}
