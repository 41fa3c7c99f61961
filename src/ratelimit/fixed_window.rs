use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{RateDecision, RateLimiter};

struct Window {
    started: Instant,
    count: u32,
}

/// At most `max_requests` per key in each window of length `window`.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn name(&self) -> &'static str {
        "fixed-window"
    }

    fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let reset = entry.started + self.window;
            return RateDecision::deny(reset.saturating_duration_since(now));
        }

        entry.count += 1;
        RateDecision::allow(self.max_requests - entry.count)
    }

    fn cleanup_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_and_reset() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();

        assert_eq!(limiter.check_at("ip", t0).remaining, 1);
        assert!(limiter.check_at("ip", t0).allowed);

        let denied = limiter.check_at("ip", t0 + Duration::from_secs(20));
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Duration::from_secs(40));

        // Other keys are independent
        assert!(limiter.check_at("other", t0).allowed);

        assert!(limiter.check_at("ip", t0 + Duration::from_secs(60)).allowed);
    }

    #[test]
    fn test_cleanup_drops_expired_windows() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        limiter.check_at("a", t0);
        limiter.check_at("b", t0 + Duration::from_secs(5));

        assert_eq!(limiter.cleanup_at(t0 + Duration::from_secs(12)), 1);
        assert_eq!(limiter.len(), 1);
    }
}
