//! Retry policy for failed handler invocations.

use std::time::Duration;

/// How often and how quickly a failed handler is retried.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_interval`: 100ms
/// - `max_interval`: 10 seconds
/// - `multiplier`: 1.0 (fixed interval)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Cap for the backoff delay.
    pub max_interval: Duration,
    /// Backoff growth factor between retries.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
            multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    /// A fixed-interval policy.
    #[must_use]
    pub fn fixed(max_retries: usize, interval: Duration) -> Self {
        Self {
            max_retries,
            initial_interval: interval,
            max_interval: interval.max(Duration::from_secs(10)),
            multiplier: 1.0,
        }
    }

    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Delay before retry number `retry` (zero-based).
    ///
    /// `initial_interval * multiplier ^ retry`, capped at `max_interval`.
    #[must_use]
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        if retry == 0 {
            return self.initial_interval.min(self.max_interval);
        }

        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay_secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        if !delay_secs.is_finite() || delay_secs >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }
        Duration::from_secs_f64(delay_secs.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_three_retries_at_a_fixed_100ms() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        for retry in 0..3 {
            assert_eq!(policy.delay_for_retry(retry), Duration::from_millis(100));
        }
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(100))
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_millis(500));

        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_retry(60), Duration::from_millis(500));
    }
}
