//! Exponential backoff with jitter for item-level retries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

/// Fraction of the computed delay that may be added as jitter.
const JITTER_FRACTION: f64 = 0.25;

/// Source of randomness for retry jitter.
///
/// `sample` must return a value in `[0, 1)`.
pub trait JitterSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Jitter drawn from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Constant jitter, for reproducible delays in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
    jitter: Arc<dyn JitterSource>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self::with_jitter(base_delay, max_delay, max_retries, Arc::new(ThreadRngJitter))
    }

    pub fn with_jitter(
        base_delay: Duration,
        max_delay: Duration,
        max_retries: u32,
        jitter: Arc<dyn JitterSource>,
    ) -> Self {
        Self {
            base_delay,
            max_delay,
            max_retries,
            jitter,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether another attempt is allowed after `retries_so_far` retries.
    pub fn should_retry(&self, retries_so_far: u32) -> bool {
        retries_so_far < self.max_retries
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// `base * 2^(attempt-1)`, capped at the maximum delay, plus up to 25%
    /// jitter on top of the capped value. Attempt 0 is treated as 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let base_ms = self.base_delay.as_millis().min(u64::MAX as u128) as u64;
        let factor = 2u64.checked_pow(exponent).unwrap_or(u64::MAX);
        let max_ms = self.max_delay.as_millis().min(u64::MAX as u128) as u64;
        let computed = base_ms.saturating_mul(factor).min(max_ms);

        let jitter_ms = (computed as f64 * JITTER_FRACTION * self.jitter.sample()) as u64;
        Duration::from_millis(computed.saturating_add(jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_secs(30), 2)
    }
}
