//! # Delay between retry attempts.
//!
//! [`BackoffPolicy`] decides how long a failed unit waits before it is handed
//! back to the worker pool. The delay for the `n`-th retry (0-based) is
//! `first × factor^n`, capped at `max`, then passed through the jitter policy.
//!
//! The default is immediate resubmission, which matches a plain
//! "retry up to k times" policy.
//!
//! ```rust
//! use std::time::Duration;
//! use batchvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(50),
//!     max: Duration::from_secs(1),
//!     factor: 3.0,
//!     jitter: JitterPolicy::None,
//! };
//! assert_eq!(backoff.delay(0), Duration::from_millis(50));
//! assert_eq!(backoff.delay(2), Duration::from_millis(450));
//! assert_eq!(backoff.delay(9), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::jitter::JitterPolicy;

/// Retry delay schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Growth factor per retry (`>= 1.0`).
    pub factor: f64,
    /// Randomization applied to the capped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Immediate retries: `first = 0`, `max = 30s`, `factor = 1.0`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Exponential backoff starting at `first` and doubling up to `max`.
    pub fn exponential(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns a copy with a different jitter policy.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Computes the delay before retry number `retry` (0 = first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        if self.first.is_zero() {
            return Duration::ZERO;
        }
        let exp = retry.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        let base = if !secs.is_finite() || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        };
        self.jitter.apply(base.min(self.max))
    }

    /// Rejects parameters that cannot produce a sane schedule.
    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ConfigError::InvalidBackoff {
                reason: format!("factor must be finite and >= 1.0, got {}", self.factor),
            });
        }
        if self.first > self.max {
            return Err(ConfigError::InvalidBackoff {
                reason: format!("first delay {:?} exceeds max {:?}", self.first, self.max),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling() -> BackoffPolicy {
        BackoffPolicy::exponential(Duration::from_millis(100), Duration::from_secs(2))
    }

    #[test]
    fn default_retries_immediately() {
        let policy = BackoffPolicy::default();
        for retry in 0..5 {
            assert_eq!(policy.delay(retry), Duration::ZERO);
        }
        assert!(policy.check().is_ok());
    }

    #[test]
    fn grows_by_factor() {
        let policy = doubling();
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
    }

    #[test]
    fn capped_at_max() {
        let policy = doubling();
        assert_eq!(policy.delay(5), Duration::from_secs(2));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn jitter_never_exceeds_cap() {
        let policy = doubling().with_jitter(JitterPolicy::Full);
        for retry in 0..20 {
            assert!(policy.delay(retry) <= Duration::from_secs(2));
        }
    }

    #[test]
    fn rejects_shrinking_or_nan_factor() {
        let mut policy = doubling();
        policy.factor = 0.5;
        assert!(matches!(
            policy.check(),
            Err(ConfigError::InvalidBackoff { .. })
        ));
        policy.factor = f64::NAN;
        assert!(policy.check().is_err());
    }

    #[test]
    fn rejects_first_above_max() {
        let policy = BackoffPolicy::exponential(Duration::from_secs(5), Duration::from_secs(1));
        assert!(policy.check().is_err());
    }
}
