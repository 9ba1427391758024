//! Exponential backoff for feed rate-limit signals.
//!
//! This is the only retry policy in the collector. Other fetch failures are
//! never retried.

use std::time::Duration;

use sportrend_core::AppConfig;

/// Wait schedule applied after consecutive rate-limit signals.
///
/// Schedule with `base = 15 s`, `cap = 900 s`:
///
/// | Signal | Wait before next attempt (pre-jitter) |
/// |--------|---------------------------------------|
/// | 1      | 15 s × 2¹ = 30 s                      |
/// | 2      | 15 s × 2² = 60 s                      |
/// | 3      | 15 s × 2³ = 120 s                     |
/// | 6+     | capped at 900 s                       |
///
/// Jitter adds a uniform 0–25 % on top of the capped delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    /// Rate-limit signals tolerated per query before it is abandoned.
    pub max_retries: u32,
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(base: Duration, cap: Duration, max_retries: u32) -> Self {
        Self {
            base,
            cap,
            max_retries,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_secs(config.backoff_base_secs),
            Duration::from_secs(config.backoff_cap_secs),
            config.max_retries,
        )
    }

    /// Pre-jitter wait after the `attempt`-th consecutive rate-limit signal (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base.saturating_mul(multiplier).min(self.cap)
    }

    /// `delay` plus a uniform 0–25 % extra.
    #[must_use]
    pub fn with_jitter(delay: Duration) -> Duration {
        delay.mul_f64(1.0 + rand::random::<f64>() * 0.25)
    }

    /// `true` once `attempt` signals exceed the retry budget.
    #[must_use]
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_retries
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(15), Duration::from_secs(900), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn three_signals_wait_30_60_120() {
        let policy = BackoffPolicy::new(secs(15), secs(900), 3);
        assert_eq!(policy.delay_for(1), secs(30));
        assert_eq!(policy.delay_for(2), secs(60));
        assert_eq!(policy.delay_for(3), secs(120));
    }

    #[test]
    fn delay_is_capped() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(5), secs(480));
        assert_eq!(policy.delay_for(6), secs(900));
        assert_eq!(policy.delay_for(40), secs(900));
        assert_eq!(policy.delay_for(u32::MAX), secs(900));
    }

    #[test]
    fn jitter_stays_within_a_quarter() {
        for _ in 0..200 {
            let jittered = BackoffPolicy::with_jitter(secs(120));
            assert!(jittered >= secs(120));
            assert!(jittered <= secs(150));
        }
    }

    #[test]
    fn budget_counts_signals_not_attempts() {
        let policy = BackoffPolicy::new(secs(15), secs(900), 3);
        assert!(!policy.is_exhausted(3));
        assert!(policy.is_exhausted(4));
    }

    #[test]
    fn zero_base_never_sleeps() {
        let policy = BackoffPolicy::new(Duration::ZERO, secs(900), 3);
        assert_eq!(policy.delay_for(3), Duration::ZERO);
    }
}
