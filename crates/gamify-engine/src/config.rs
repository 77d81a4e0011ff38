//! Engine tunables.

use std::time::Duration;

use rand::Rng;

/// How long each cached read view lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTtls {
    /// Stats view (`gamification:stats:{user}:{generation}`).
    pub stats: Duration,
    /// Level progress view (`gamification:level:{user}:{generation}`).
    pub level: Duration,
    /// Badge list view (`gamification:badges:{user}:{generation}`).
    pub badges: Duration,
}

impl Default for ViewTtls {
    fn default() -> Self {
        Self {
            stats: Duration::from_secs(60),
            level: Duration::from_secs(300),
            badges: Duration::from_secs(3600),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cached view lifetimes.
    pub view_ttls: ViewTtls,

    /// Lifetime of the `completed:{user}:{target}:{day}` marker. Must cover at
    /// least the rest of the credited day in any timezone.
    pub claim_marker_ttl: Duration,

    /// How many times a claim is recomputed after losing a revision race
    /// before giving up with [`crate::EngineError::Contention`].
    ///
    /// Every lost race means another claim for the same user committed, so
    /// up to this many concurrent claims per user always converge.
    pub max_commit_attempts: u32,

    /// Backoff before the second commit attempt. Doubles per attempt.
    pub retry_backoff_initial: Duration,

    /// Upper bound for a single backoff.
    pub retry_backoff_max: Duration,
}

impl EngineConfig {
    /// Delay before retrying after `attempt` lost its revision race.
    ///
    /// Exponential in `attempt`, capped at `retry_backoff_max`, with the upper
    /// half randomized so contenders spread out.
    #[must_use]
    pub fn commit_backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        let ceiling = self
            .retry_backoff_initial
            .saturating_mul(1_u32 << doublings)
            .min(self.retry_backoff_max);

        let half = ceiling / 2;
        let spread = u64::try_from((ceiling - half).as_micros()).unwrap_or(u64::MAX);
        half + Duration::from_micros(rand::thread_rng().gen_range(0..=spread))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            view_ttls: ViewTtls::default(),
            claim_marker_ttl: Duration::from_secs(36 * 60 * 60),
            max_commit_attempts: 16,
            retry_backoff_initial: Duration::from_millis(2),
            retry_backoff_max: Duration::from_millis(100),
        }
    }
}
