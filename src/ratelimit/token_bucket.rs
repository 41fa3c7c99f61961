use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{RateDecision, RateLimiter};

/// Longest wait reported to a client; a bucket with no refill never reopens
const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// `capacity` tokens per key, refilled continuously at `refill_per_sec`.
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: DashMap<String, Bucket>,
}

impl TokenBucketLimiter {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: capacity as f64,
            refill_per_sec,
            buckets: DashMap::new(),
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.refilled_at = now;
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn name(&self) -> &'static str {
        "token-bucket"
    }

    fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            refilled_at: now,
        });
        self.refill(&mut bucket, now);

        if bucket.tokens < 1.0 {
            let missing = 1.0 - bucket.tokens;
            let wait = if self.refill_per_sec > 0.0 {
                Duration::try_from_secs_f64(missing / self.refill_per_sec)
                    .map_or(MAX_WAIT, |wait| wait.min(MAX_WAIT))
            } else {
                MAX_WAIT
            };
            return RateDecision::deny(wait);
        }

        bucket.tokens -= 1.0;
        RateDecision::allow(bucket.tokens.floor() as u32)
    }

    /// Full buckets carry no state worth keeping
    fn cleanup_at(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            self.refill(bucket, now);
            bucket.tokens < self.capacity
        });
        before.saturating_sub(self.buckets.len())
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }
}
