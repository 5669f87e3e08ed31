//! Retry policy for node execution.

use std::time::Duration;

/// Controls whether and how a failed node execution is retried.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// No retries; the first failure is final.
    None,
    /// Exponential backoff: `delay = min(max_delay, initial_delay * multiplier^attempt)`.
    Exponential {
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::None
    }
}

impl RetryPolicy {
    /// Convenience constructor for the exponential-backoff variant.
    pub fn exponential(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    ) -> Self {
        RetryPolicy::Exponential {
            max_attempts,
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// Max number of attempts (including the first). `None` means no retries (1 attempt).
    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryPolicy::None => 1,
            RetryPolicy::Exponential { max_attempts, .. } => *max_attempts,
        }
    }

    /// Delay to wait before the given retry attempt (1-based: the delay before the
    /// second overall attempt is `delay_for_attempt(1)`). Returns `None` once attempts
    /// are exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            RetryPolicy::None => None,
            RetryPolicy::Exponential {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let scaled = initial_delay.as_secs_f64() * multiplier.powi(attempt as i32 - 1).max(1.0);
                let scaled = if attempt == 0 { initial_delay.as_secs_f64() } else { scaled };
                let capped = scaled.min(max_delay.as_secs_f64());
                Some(Duration::from_secs_f64(capped.max(0.0)))
            }
        }
    }
}
