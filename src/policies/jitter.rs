//! # Jitter for retry delays.
//!
//! Randomizes the computed backoff so that units failing together do not all
//! come back at the same instant.
//!
//! - [`JitterPolicy::None`] keeps the delay as computed.
//! - [`JitterPolicy::Full`] picks uniformly in `[0, delay]`.
//! - [`JitterPolicy::Equal`] keeps half and randomizes the other half: `delay/2 + [0, delay/2]`.

use rand::Rng;
use std::time::Duration;

/// Randomization applied on top of [`BackoffPolicy`](crate::BackoffPolicy) delays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Exact delays.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2` plus uniform in `[0, delay/2]`.
    Equal,
}

impl JitterPolicy {
    /// Applies the jitter to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return delay;
        }
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                let extra = if half == 0 {
                    0
                } else {
                    rand::rng().random_range(0..=half)
                };
                Duration::from_millis(half + extra)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn zero_delay_stays_zero() {
        for jitter in [JitterPolicy::None, JitterPolicy::Full, JitterPolicy::Equal] {
            assert_eq!(jitter.apply(Duration::ZERO), Duration::ZERO);
        }
    }

    #[test]
    fn full_stays_within_delay() {
        for _ in 0..200 {
            assert!(JitterPolicy::Full.apply(Duration::from_millis(80)) <= Duration::from_millis(80));
        }
    }

    #[test]
    fn equal_keeps_at_least_half() {
        for _ in 0..200 {
            let d = JitterPolicy::Equal.apply(Duration::from_millis(400));
            assert!(d >= Duration::from_millis(200), "{d:?} below half");
            assert!(d <= Duration::from_millis(400), "{d:?} above delay");
        }
    }
}
