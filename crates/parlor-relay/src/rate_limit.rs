//! Per-connection ingress rate limiting.
//!
//! Reworked from `tallow-relay::rate_limit::RateLimiter`'s fixed-window
//! counter into a token bucket, since spec §4.2 calls for burst tolerance
//! (10 tokens/sec, burst 15) rather than a hard per-second cap.

use std::time::Instant;

/// A token bucket limiter. One instance per connection (spec §3: each
/// connection owns its own ingress rate limiter).
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(refill_per_sec: u32, burst: u32) -> Self {
        Self {
            capacity: burst as f64,
            tokens: burst as f64,
            refill_per_sec: refill_per_sec as f64,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            self.last_refill = now;
        }
    }

    /// Attempt to consume one token. Returns `true` if the request is
    /// allowed, `false` if it should be refused.
    pub fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn allows_up_to_burst_immediately() {
        let mut bucket = TokenBucket::new(10, 15);
        for _ in 0..15 {
            assert!(bucket.try_consume());
        }
        assert!(!bucket.try_consume());
    }

    #[test]
    fn refills_over_time() {
        let mut bucket = TokenBucket::new(100, 1);
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());
        sleep(Duration::from_millis(20));
        assert!(bucket.try_consume());
    }
}
