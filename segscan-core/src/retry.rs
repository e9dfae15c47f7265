//! Per-segment exponential backoff.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Backoff state owned by a single segment loop.
///
/// Each consecutive failure doubles (by `backoff_factor`) the anchor delay
/// starting from `backoff_base`, capped at `backoff_max`. With jitter the
/// actual delay is drawn uniformly from `[base, anchor]`. A successful call
/// must [`reset`](Backoff::reset) the state.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Consecutive failures recorded since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Record a failure and return how long to wait before retrying, or
    /// `None` once `max_attempts` consecutive failures have been seen.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let anchor = self.anchor_ms(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        if let Some(max) = self.config.max_attempts
            && self.attempt >= max
        {
            return None;
        }

        let delay_ms = if self.config.jitter {
            self.jittered_ms(anchor)
        } else {
            anchor
        };
        Some(Duration::from_millis(delay_ms))
    }

    fn anchor_ms(&self, attempt: u32) -> u64 {
        let base = self.config.backoff_base_ms;
        if base == 0 {
            return 0;
        }

        let exp = attempt.min(63) as i32;
        let scaled = (base as f64) * self.config.backoff_factor.powi(exp);
        let capped = scaled.min(self.config.backoff_max_ms as f64);
        capped.max(0.0) as u64
    }

    fn jittered_ms(&self, anchor_ms: u64) -> u64 {
        let lower = self.config.backoff_base_ms.min(anchor_ms);
        if anchor_ms <= lower {
            return anchor_ms;
        }
        rand::rng().random_range(lower..=anchor_ms)
    }
}
