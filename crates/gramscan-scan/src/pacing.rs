//! Randomized pacing between provider requests.
//!
//! Delays are sampled uniformly from wide ranges so the request cadence
//! never settles into a detectable fixed rhythm. The ranges are
//! configurable, but the defaults keep the intended orders of magnitude:
//! seconds between posts and stories, minutes between targets, and a long
//! cooldown after a rate limit.

use std::time::Duration;

use rand::Rng;

use gramscan_core::AppConfig;

/// An inclusive delay range sampled uniformly in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct DelayRange {
    min_ms: u64,
    max_ms: u64,
}

impl DelayRange {
    #[must_use]
    pub fn from_secs(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_ms: min_secs.saturating_mul(1000),
            max_ms: max_secs.saturating_mul(1000),
        }
    }

    /// Draws one delay from the range. Sampling in milliseconds keeps the
    /// sub-second jitter even when the bounds are whole seconds.
    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }

    /// Sleeps for one sampled delay. A zero range returns immediately.
    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// The full pacing policy for one crawl.
#[derive(Debug, Clone, Copy)]
pub struct PacingPolicy {
    pub per_post: DelayRange,
    pub per_story: DelayRange,
    pub between_targets: DelayRange,
    pub rate_limit_cooldown: DelayRange,
}

impl PacingPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            per_post: DelayRange::from_secs(config.post_delay_min_secs, config.post_delay_max_secs),
            per_story: DelayRange::from_secs(
                config.story_delay_min_secs,
                config.story_delay_max_secs,
            ),
            between_targets: DelayRange::from_secs(
                config.target_delay_min_secs,
                config.target_delay_max_secs,
            ),
            rate_limit_cooldown: DelayRange::from_secs(
                config.cooldown_min_secs,
                config.cooldown_max_secs,
            ),
        }
    }

    /// All-zero policy for tests that must not sleep.
    #[must_use]
    pub fn zero() -> Self {
        let zero = DelayRange::from_secs(0, 0);
        Self {
            per_post: zero,
            per_story: zero,
            between_targets: zero,
            rate_limit_cooldown: zero,
        }
    }
}
