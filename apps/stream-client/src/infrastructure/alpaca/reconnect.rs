//! Reconnection Policy
//!
//! Exponential backoff for WebSocket reconnection:
//! `delay(attempt) = base × 2^(attempt − 1)`, attempts counted from 1, with
//! a configurable cap and attempt budget. The attempt counter is reset only
//! when a connection reaches the authenticated state, so a socket that
//! opens but never authenticates still burns an attempt when it closes.
//!
//! Jitter is available for fleet deployments but defaults to zero so the
//! delay schedule is exact.

use std::time::Duration;

use rand::Rng;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first reconnection attempt; doubles each attempt.
    pub base_delay: Duration,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Maximum number of consecutive attempts (0 = unlimited).
    pub max_attempts: u32,
    /// Jitter factor as a fraction (e.g. 0.1 = ±10% randomization).
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(64),
            max_attempts: 5,
            jitter_factor: 0.0,
        }
    }
}

impl BackoffConfig {
    /// Create configuration from [`WebSocketSettings`].
    ///
    /// [`WebSocketSettings`]: crate::infrastructure::config::WebSocketSettings
    #[must_use]
    pub const fn from_settings(settings: &crate::infrastructure::config::WebSocketSettings) -> Self {
        Self {
            base_delay: settings.reconnect_delay_base,
            max_delay: settings.reconnect_delay_max,
            max_attempts: settings.max_reconnect_attempts,
            jitter_factor: settings.reconnect_jitter,
        }
    }
}

/// Reconnection policy implementing exponential backoff.
///
/// # Example
///
/// ```rust
/// use alpaca_stream_client::infrastructure::alpaca::reconnect::{BackoffConfig, BackoffPolicy};
/// use std::time::Duration;
///
/// let mut policy = BackoffPolicy::new(BackoffConfig::default());
///
/// assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
/// assert_eq!(policy.next_delay(), Some(Duration::from_millis(2000)));
///
/// // A connection authenticated: start over.
/// policy.reset();
/// assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
/// ```
#[derive(Debug)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    attempts: u32,
}

impl BackoffPolicy {
    /// Create a new policy with zero attempts consumed.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Consume one attempt and return its delay.
    ///
    /// Returns `None` when the attempt budget is exhausted; the caller must
    /// stop retrying and surface the terminal condition.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempts >= self.config.max_attempts {
            return None;
        }

        self.attempts += 1;

        let shift = self.attempts - 1;
        let base_millis = u64::try_from(self.config.base_delay.as_millis()).unwrap_or(u64::MAX);
        let delay = if shift >= 63 {
            self.config.max_delay
        } else {
            let millis = base_millis.saturating_mul(1_u64 << shift);
            Duration::from_millis(millis).min(self.config.max_delay)
        };

        Some(self.apply_jitter(delay))
    }

    /// Reset after a connection reached the authenticated state.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Number of attempts consumed since the last reset.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempts
    }

    /// Whether another attempt is still within budget.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempts < self.config.max_attempts
    }

    /// Apply jitter to a duration.
    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.config.jitter_factor;
        let mut rng = rand::rng();
        let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = adjusted_millis as u64;
        Duration::from_millis(adjusted_u64)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn exact_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy::new(BackoffConfig {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(64),
            max_attempts,
            jitter_factor: 0.0,
        })
    }

    #[test_case(1, 1000; "first attempt waits one second")]
    #[test_case(2, 2000; "second attempt waits two seconds")]
    #[test_case(3, 4000; "third attempt waits four seconds")]
    #[test_case(4, 8000; "fourth attempt waits eight seconds")]
    #[test_case(5, 16000; "fifth attempt waits sixteen seconds")]
    fn delay_schedule_is_exact(attempt: u32, expected_ms: u64) {
        let mut policy = exact_policy(5);

        let mut delay = None;
        for _ in 0..attempt {
            delay = policy.next_delay();
        }

        assert_eq!(delay, Some(Duration::from_millis(expected_ms)));
        assert_eq!(policy.attempt(), attempt);
    }

    #[test]
    fn sixth_attempt_is_refused() {
        let mut policy = exact_policy(5);

        for _ in 0..5 {
            assert!(policy.next_delay().is_some());
        }

        assert_eq!(policy.next_delay(), None);
        assert!(!policy.can_retry());
    }

    #[test]
    fn reset_restores_full_budget() {
        let mut policy = exact_policy(5);

        let _ = policy.next_delay();
        let _ = policy.next_delay();
        assert_eq!(policy.attempt(), 2);

        policy.reset();

        assert_eq!(policy.attempt(), 0);
        assert!(policy.can_retry());
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn delay_is_capped_at_max() {
        let mut policy = BackoffPolicy::new(BackoffConfig {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(2500),
            max_attempts: 0,
            jitter_factor: 0.0,
        });

        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(2000)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(2500)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn zero_max_attempts_is_unlimited() {
        let mut policy = BackoffPolicy::new(BackoffConfig {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            max_attempts: 0,
            jitter_factor: 0.0,
        });

        for _ in 0..1000 {
            assert!(policy.can_retry());
            assert!(policy.next_delay().is_some());
        }
    }

    #[test]
    fn large_attempt_counts_stay_capped() {
        let mut policy = BackoffPolicy::new(BackoffConfig {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(64),
            max_attempts: 0,
            jitter_factor: 0.0,
        });

        for _ in 0..100 {
            let delay = policy.next_delay().unwrap();
            assert!(delay <= Duration::from_secs(64));
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for _ in 0..100 {
            let mut policy = BackoffPolicy::new(BackoffConfig {
                base_delay: Duration::from_millis(1000),
                max_delay: Duration::from_secs(64),
                max_attempts: 0,
                jitter_factor: 0.1,
            });

            let millis = policy.next_delay().unwrap().as_millis();
            assert!(millis >= 900, "delay {millis}ms is below minimum 900ms");
            assert!(millis <= 1100, "delay {millis}ms is above maximum 1100ms");
        }
    }

    #[test]
    fn default_config_matches_policy_contract() {
        let config = BackoffConfig::default();
        assert_eq!(config.base_delay, Duration::from_millis(1000));
        assert_eq!(config.max_attempts, 5);
        assert!(config.jitter_factor.abs() < f64::EPSILON);
    }
}
