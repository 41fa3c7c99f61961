use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::{RateDecision, RateLimiter};

/// Timestamp log per key; at most `max_requests` in any trailing `window`.
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    logs: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            logs: DashMap::new(),
        }
    }

    fn evict(&self, log: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = log.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn name(&self) -> &'static str {
        "sliding-window"
    }

    fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut log = self.logs.entry(key.to_string()).or_default();
        self.evict(&mut log, now);

        if log.len() as u32 >= self.max_requests {
            // Allowed again once the oldest entry leaves the window
            let retry = log
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            return RateDecision::deny(retry);
        }

        log.push_back(now);
        RateDecision::allow(self.max_requests - log.len() as u32)
    }

    fn cleanup_at(&self, now: Instant) -> usize {
        let before = self.logs.len();
        self.logs.retain(|_, log| {
            self.evict(log, now);
            !log.is_empty()
        });
        before.saturating_sub(self.logs.len())
    }

    fn len(&self) -> usize {
        self.logs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.check_at("u1", t0).allowed);
        assert!(limiter.check_at("u1", t0 + Duration::from_secs(30)).allowed);

        let denied = limiter.check_at("u1", t0 + Duration::from_secs(45));
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Duration::from_secs(15));

        // First request has left the window, second is still in it
        let after = limiter.check_at("u1", t0 + Duration::from_secs(61));
        assert!(after.allowed);
        assert_eq!(after.remaining, 0);
    }

    #[test]
    fn test_denied_requests_are_not_logged() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        limiter.check_at("u1", t0);
        for s in 1..5 {
            assert!(!limiter.check_at("u1", t0 + Duration::from_secs(s)).allowed);
        }
        assert!(limiter.check_at("u1", t0 + Duration::from_secs(10)).allowed);
    }

    #[test]
    fn test_cleanup() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(10));
        let t0 = Instant::now();
        limiter.check_at("old", t0);
        limiter.check_at("new", t0 + Duration::from_secs(8));

        assert_eq!(limiter.cleanup_at(t0 + Duration::from_secs(11)), 1);
        assert_eq!(limiter.len(), 1);
    }
}
