//! Token bucket rate limiter for outbound API requests.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with continuous refill.
///
/// Capacity equals the refill rate, so a full second of burst is tolerated.
/// `acquire` waits until a token is available, then consumes it.
pub struct TokenBucketRateLimiter {
    bucket: Mutex<Bucket>,
    capacity: f64,
    refill_rate: f64,
}

impl TokenBucketRateLimiter {
    /// `requests_per_second` must be positive (validated at config load).
    pub fn new(requests_per_second: f64) -> Self {
        let capacity = requests_per_second.max(1.0);
        Self {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_rate: requests_per_second,
        }
    }

    /// Wait until a request token is available and consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let elapsed = bucket.last_refill.elapsed().as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
                bucket.last_refill = Instant::now();

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                (1.0 - bucket.tokens) / self.refill_rate
            };
            sleep(Duration::from_secs_f64(wait)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_within_capacity_is_immediate() {
        let limiter = TokenBucketRateLimiter::new(10.0);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_acquire_waits_when_bucket_is_empty() {
        let limiter = TokenBucketRateLimiter::new(20.0);
        for _ in 0..20 {
            limiter.acquire().await;
        }
        let start = Instant::now();
        limiter.acquire().await;
        // One token refills in 1/20s.
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
