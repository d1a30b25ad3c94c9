use std::time::Duration;

use rand::Rng;

/// Retry and per-attempt timeout settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_backoff: Duration,
    /// Upper bound for a single backoff delay.
    pub max_backoff: Duration,
    /// Fraction of the delay (0.0 to 1.0) randomized up or down.
    pub jitter_factor: f64,
    /// Bound on a single attempt.
    pub call_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            jitter_factor: 0.2,
            call_timeout: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting between calls.
    pub fn no_retry(call_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter_factor: 0.0,
            call_timeout,
        }
    }

    /// Delay to wait after the failed attempt `attempt` (0-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_backoff.as_secs_f64() * 2_f64.powi(attempt.min(30) as i32);
        let capped = exp.min(self.max_backoff.as_secs_f64());

        let jitter_range = capped * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_secs_f64((capped + jitter).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryConfig {
        RetryConfig {
            jitter_factor: 0.0,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let config = no_jitter();
        assert_eq!(config.backoff(0), Duration::from_millis(100));
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = no_jitter();
        assert_eq!(config.backoff(10), Duration::from_secs(2));
        assert_eq!(config.backoff(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_stays_within_factor() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = config.backoff(1).as_secs_f64();
            assert!((0.159..=0.241).contains(&delay), "delay {delay} out of range");
        }
    }
}
