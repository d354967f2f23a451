//! Exponential backoff with a cap and deterministic jitter.

use std::hash::{Hash, Hasher};
use std::time::Duration;

use uuid::Uuid;

use crate::domain::models::RetryConfig;

/// Backoff schedule for retriable steps.
///
/// Delay doubles per attempt from the initial value, capped at the maximum,
/// with up to 25% jitter on top. Jitter is derived from (run id, attempt)
/// rather than a process RNG so schedules are reproducible.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_attempts: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl BackoffPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }

    /// Maximum attempts per step, first try included.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given failed attempt (0-indexed).
    pub fn delay_for(&self, run_id: Uuid, attempt: u32) -> Duration {
        let base_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        let spread = base_ms / 4;
        let jitter_ms = if spread == 0 {
            0
        } else {
            Self::jitter_seed(run_id, attempt) % (spread + 1)
        };

        Duration::from_millis(base_ms.saturating_add(jitter_ms).min(self.max_backoff_ms))
    }

    fn jitter_seed(run_id: Uuid, attempt: u32) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        run_id.hash(&mut hasher);
        attempt.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial: u64, max: u64) -> BackoffPolicy {
        BackoffPolicy::new(&RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: initial,
            max_backoff_ms: max,
        })
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = policy(1000, 6000);
        let run = Uuid::new_v4();
        let base = |attempt: u32| 1000_u64.saturating_mul(2_u64.pow(attempt)).min(6000);

        for attempt in 0..6 {
            let delay = policy.delay_for(run, attempt).as_millis() as u64;
            let expected = base(attempt);
            assert!(delay >= expected, "attempt {attempt}: {delay} < {expected}");
            assert!(
                delay <= (expected + expected / 4).min(6000),
                "attempt {attempt}: {delay} exceeds jitter bound"
            );
        }
    }

    #[test]
    fn test_jitter_is_deterministic_per_run_and_attempt() {
        let policy = policy(1000, 60_000);
        let run = Uuid::new_v4();
        assert_eq!(policy.delay_for(run, 2), policy.delay_for(run, 2));
    }

    #[test]
    fn test_cap_is_never_exceeded() {
        let policy = policy(1000, 4000);
        let run = Uuid::new_v4();
        for attempt in 0..32 {
            assert!(policy.delay_for(run, attempt) <= Duration::from_millis(4000));
        }
    }
}
