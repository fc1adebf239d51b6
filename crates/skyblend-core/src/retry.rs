//! Retry logic with exponential backoff and optional jitter.

use std::time::Duration;

use crate::CoreError;

/// Exponential backoff schedule.
///
/// The delay before retry `attempt` (0-based) is
/// `min(initial_delay * factor^attempt, max_delay)`; a zero `max_delay`
/// leaves growth uncapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// The delay before the first retry.
    pub initial_delay: Duration,
    /// The multiplicative factor for each subsequent retry.
    pub factor: f64,
    /// Upper bound on a single delay. `Duration::ZERO` means uncapped.
    pub max_delay: Duration,
    /// Whether to apply random jitter (+/- 50%) to the delay.
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            factor: 2.0,
            max_delay: Duration::from_secs(5),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Calculate the delay for a given retry attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry attempt number (0-based)
    pub fn delay(self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.initial_delay.as_secs_f64() * self.factor.powi(exponent);
        let uncapped = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX);

        let mut delay = if self.max_delay.is_zero() {
            uncapped
        } else {
            uncapped.min(self.max_delay)
        };

        // Apply jitter: +/- 50% of the delay
        if self.jitter {
            let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            let jitter_ms = millis / 2;
            let random_offset = fastrand::u64(0..=jitter_ms.saturating_mul(2));
            let total_ms = millis.saturating_sub(jitter_ms).saturating_add(random_offset);
            delay = Duration::from_millis(total_ms);
        }

        delay
    }
}

/// Configuration for the automatic retry mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// The maximum number of retries to attempt.
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// The backoff schedule to use between retries.
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with the given bounds and doubling backoff.
    pub fn exponential(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff {
                initial_delay,
                max_delay,
                ..Backoff::default()
            },
        }
    }

    /// Disable retries. The initial delay stays positive so the config validates.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Rejects schedules that cannot produce a sensible delay.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.backoff.initial_delay.is_zero() {
            return Err(CoreError::Misconfigured(String::from(
                "retry initial delay must be greater than zero",
            )));
        }
        if !self.backoff.factor.is_finite() || self.backoff.factor < 1.0 {
            return Err(CoreError::Misconfigured(format!(
                "retry backoff factor must be finite and >= 1, got {}",
                self.backoff.factor
            )));
        }
        Ok(())
    }

    /// Calculate the delay for a given retry attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff {
            initial_delay: Duration::from_millis(100),
            factor: 2.0,
            max_delay: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1)); // capped
    }

    #[test]
    fn test_zero_max_delay_means_uncapped() {
        let backoff = Backoff {
            initial_delay: Duration::from_millis(100),
            factor: 2.0,
            max_delay: Duration::ZERO,
            jitter: false,
        };

        assert_eq!(backoff.delay(6), Duration::from_millis(6_400));
    }

    #[test]
    fn test_huge_attempt_saturates_instead_of_panicking() {
        let backoff = Backoff {
            max_delay: Duration::ZERO,
            ..Backoff::default()
        };

        assert_eq!(backoff.delay(u32::MAX), Duration::MAX);
    }

    #[test]
    fn test_exponential_backoff_with_jitter() {
        let backoff = Backoff {
            initial_delay: Duration::from_millis(100),
            factor: 2.0,
            max_delay: Duration::from_secs(1),
            jitter: true,
        };

        for _ in 0..10 {
            for attempt in 0..5 {
                let delay = backoff.delay(attempt);
                let expected_capped = (100.0 * 2_f64.powi(attempt as i32)).min(1000.0);
                let delay_ms = delay.as_millis() as f64;

                assert!(delay_ms >= expected_capped * 0.49, "attempt={attempt}, delay_ms={delay_ms}");
                assert!(delay_ms <= expected_capped * 1.51, "attempt={attempt}, delay_ms={delay_ms}");
            }
        }
    }

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();

        assert_eq!(config.max_retries, 3);
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_initial_delay_is_misconfigured() {
        let config = RetryConfig::exponential(2, Duration::ZERO, Duration::from_secs(1));

        let error = config.validate().expect_err("must fail");
        assert!(matches!(error, CoreError::Misconfigured(_)));
    }

    #[test]
    fn test_retry_config_no_retry() {
        let config = RetryConfig::no_retry();

        assert_eq!(config.max_retries, 0);
        assert!(config.validate().is_ok());
    }
}
