//! Backoff for FPL requests rejected with 403
//!
//! The FPL API intermittently answers 403 to non-browser clients. Those
//! responses are retried with a linearly growing, jittered delay; every other
//! failure is treated as final.

use std::time::Duration;

use rand::Rng;

/// Retry policy for FPL data requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `base_delay * n` plus jitter
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Whether a response status is worth another attempt
#[must_use]
pub const fn is_retryable(status: u16) -> bool {
    status == 403
}

/// Delay before the next attempt after `attempt` (1-based) failed
///
/// `min(base_delay * attempt + jitter, max_delay)` with jitter drawn
/// uniformly from `[0, base_delay]`.
#[must_use]
pub fn delay_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy.base_delay.saturating_mul(attempt.max(1));
    let jitter = policy.base_delay.mul_f64(rand::thread_rng().gen_range(0.0..=1.0));
    (base + jitter).min(policy.max_delay)
}
