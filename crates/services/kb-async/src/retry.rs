use backon::ExponentialBuilder;
use std::time::Duration;

use crate::error::KbError;

/// Upper bound for the configurable retry count
pub const MAX_RETRIES_LIMIT: u32 = 5;
/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Ceiling applied to every retry delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);

/// Bounded exponential retry policy
///
/// A call is attempted at most `max_retries + 1` times. The delay before
/// retry `k` (starting at 1) is `min(base_delay * 2^(k-1), max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default delays
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `max_retries` exceeds [`MAX_RETRIES_LIMIT`].
    pub fn new(max_retries: u32) -> Result<Self, KbError> {
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(KbError::config(format!(
                "max_retries must be between 0 and {MAX_RETRIES_LIMIT}, got {max_retries}"
            )));
        }
        Ok(Self {
            max_retries,
            ..Self::default()
        })
    }

    /// Replaces the base delay and the delay ceiling
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `base` is zero or exceeds `max`.
    pub fn with_delays(mut self, base: Duration, max: Duration) -> Result<Self, KbError> {
        if base.is_zero() || base > max {
            return Err(KbError::config(format!(
                "retry delays must satisfy 0 < base ({base:?}) <= max ({max:?})"
            )));
        }
        self.base_delay = base;
        self.max_delay = max;
        Ok(self)
    }

    /// Retry budget (additional attempts after the first)
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the first retry
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Ceiling for any single delay
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Decides whether the failure of attempt `attempt` (0-based) is retried
    ///
    /// Caller-fixable kinds are rejected before the budget is consulted.
    #[must_use]
    pub const fn should_retry(&self, err: &KbError, attempt: u32) -> bool {
        if !err.is_retryable() {
            return false;
        }
        attempt < self.max_retries
    }

    /// Delay awaited before retry `retry` (1-based); zero for `retry == 0`
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Builds the `backon` schedule matching this policy
    #[must_use]
    pub fn backoff_builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_retries as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, KbError};
    use backon::BackoffBuilder;

    #[test]
    fn rejects_budget_above_limit() {
        assert!(RetryPolicy::new(5).is_ok());
        let err = RetryPolicy::new(6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn rejects_inverted_delays() {
        let p = RetryPolicy::new(1).unwrap();
        assert!(
            p.with_delays(Duration::from_secs(2), Duration::from_secs(1))
                .is_err()
        );
        assert!(p.with_delays(Duration::ZERO, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn fatal_kinds_never_retry() {
        let p = RetryPolicy::new(5).unwrap();
        for kind in [
            ErrorKind::InvalidApiKey,
            ErrorKind::InsufficientPermissions,
            ErrorKind::ValidationError,
            ErrorKind::KnowledgeBaseNotFound,
        ] {
            for attempt in 0..=5 {
                assert!(!p.should_retry(&KbError::new(kind), attempt), "{kind}");
            }
        }
    }

    #[test]
    fn transient_kinds_retry_until_budget() {
        let p = RetryPolicy::new(3).unwrap();
        for kind in [
            ErrorKind::NetworkError,
            ErrorKind::RequestTimeout,
            ErrorKind::RateLimitExceeded,
            ErrorKind::InternalServerError,
            ErrorKind::ServiceUnavailable,
        ] {
            let err = KbError::new(kind);
            assert!(p.should_retry(&err, 0));
            assert!(p.should_retry(&err, 2));
            assert!(!p.should_retry(&err, 3));
        }
    }

    #[test]
    fn zero_budget_never_retries() {
        let p = RetryPolicy::new(0).unwrap();
        assert!(!p.should_retry(&KbError::new(ErrorKind::NetworkError), 0));
    }

    #[test]
    fn delays_double_and_cap() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(0), Duration::ZERO);
        assert_eq!(p.delay_for(1), Duration::from_millis(1000));
        assert_eq!(p.delay_for(2), Duration::from_millis(2000));
        assert_eq!(p.delay_for(3), Duration::from_millis(4000));
        assert_eq!(p.delay_for(4), Duration::from_millis(8000));
        assert_eq!(p.delay_for(5), Duration::from_millis(10_000));
        assert_eq!(p.delay_for(40), Duration::from_millis(10_000));
    }

    #[test]
    fn backoff_schedule_matches_policy() {
        let p = RetryPolicy::new(5).unwrap();
        let delays: Vec<Duration> = p.backoff_builder().build().collect();
        let expected: Vec<Duration> = (1..=5).map(|k| p.delay_for(k)).collect();
        assert_eq!(delays, expected);
    }
}
