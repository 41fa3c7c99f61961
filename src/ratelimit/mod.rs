//! Per-process request limiters
//!
//! State lives in a `DashMap` keyed by client IP or user id, is lost on
//! restart and is pruned by the scheduler.

mod fixed_window;
mod sliding_window;
mod token_bucket;

pub use fixed_window::FixedWindowLimiter;
pub use sliding_window::SlidingWindowLimiter;
pub use token_bucket::TokenBucketLimiter;

use std::time::{Duration, Instant};

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests left in the current allowance
    pub remaining: u32,
    /// Zero when allowed
    pub retry_after: Duration,
}

impl RateDecision {
    pub fn allow(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after: Duration::ZERO,
        }
    }

    pub fn deny(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after,
        }
    }

    /// `Retry-After` value, rounded up to at least one second
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 {
            secs.saturating_add(1)
        } else {
            secs.max(1)
        }
    }
}

pub trait RateLimiter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Record a request for `key` at `now` and decide whether it may pass.
    fn check_at(&self, key: &str, now: Instant) -> RateDecision;

    fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Drop keys with no state left to enforce. Returns how many were removed.
    fn cleanup_at(&self, now: Instant) -> usize;

    fn cleanup(&self) -> usize {
        let removed = self.cleanup_at(Instant::now());
        if removed > 0 {
            tracing::debug!("{} limiter dropped {} idle keys", self.name(), removed);
        }
        removed
    }

    /// Number of tracked keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(RateDecision::deny(Duration::from_millis(1500)).retry_after_secs(), 2);
        assert_eq!(RateDecision::deny(Duration::from_secs(3)).retry_after_secs(), 3);
        assert_eq!(RateDecision::deny(Duration::ZERO).retry_after_secs(), 1);
        assert_eq!(RateDecision::deny(Duration::MAX).retry_after_secs(), u64::MAX);
    }
}
