//! Bounded retry policy for evidence and metadata fetches
//!
//! The schedule itself is a pure function of the attempt number, so retry
//! behavior is testable without sleeping or a live upstream. Jitter is
//! applied separately at the call site that actually waits.

use std::time::Duration;

use rand::Rng;

/// Bounded exponential backoff: `base * 2^(attempt-1)`, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay to wait after a failed attempt (1-based), or `None` when the
    /// attempt budget is exhausted and the caller should give up.
    pub fn backoff(&self, failed_attempt: u32) -> Option<Duration> {
        if failed_attempt == 0 || failed_attempt >= self.max_attempts {
            return None;
        }
        let exp = failed_attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        Some(delay.min(self.max_delay))
    }

    /// `backoff` with up to 25% random jitter added, to avoid retry bursts
    /// landing in lockstep on a rate-limited upstream.
    pub fn backoff_with_jitter(&self, failed_attempt: u32) -> Option<Duration> {
        let delay = self.backoff(failed_attempt)?;
        let jitter_cap = delay.as_millis() as u64 / 4;
        let jitter = if jitter_cap > 0 {
            rand::rng().random_range(0..=jitter_cap)
        } else {
            0
        };
        Some(delay + Duration::from_millis(jitter))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::constants::DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(crate::constants::DEFAULT_BACKOFF_BASE_MS),
            max_delay: Duration::from_millis(crate::constants::DEFAULT_BACKOFF_CAP_MS),
        }
    }
}
