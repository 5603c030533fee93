//! # Run configuration.
//!
//! Provides [`RunConfig`], the settings of one [`Orchestrator`](crate::Orchestrator).
//!
//! ## Sentinel values
//! - `timeout = 0s` → no per-attempt timeout
//! - `prefetch = 0` → submit only as many units as there are free worker slots

use std::borrow::Cow;
use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::{BackoffPolicy, FailurePolicy};
use crate::progress::ProgressMode;

/// Settings of an orchestrator run.
///
/// ## Field semantics
/// - `concurrency`: maximum units running at once (`0` is rejected by [`validate`](Self::validate))
/// - `policy`: what a failed unit does to itself and the rest of the run
/// - `progress`: which reporters are created
/// - `prefetch`: extra units handed to the pool ahead of free slots
/// - `timeout`: per-attempt timeout (`0s` = none)
/// - `backoff`: delay before a retried unit competes for a slot again
/// - `max_adapter_failures`: consecutive pool refusals tolerated before the run aborts
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `cancel_on_signal`: treat SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere) as a cancel request
/// - `description`: label shown by progress reporters
///
/// All fields are public. Prefer the helper accessors over checking sentinels directly.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub concurrency: usize,
    pub policy: FailurePolicy,
    pub progress: ProgressMode,
    pub prefetch: usize,
    pub timeout: Duration,
    pub backoff: BackoffPolicy,
    pub max_adapter_failures: usize,
    pub bus_capacity: usize,
    pub cancel_on_signal: bool,
    pub description: Cow<'static, str>,
}

impl RunConfig {
    /// Checks the configuration before anything is submitted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_adapter_failures == 0 {
            return Err(ConfigError::ZeroAdapterFailureLimit);
        }
        self.backoff.check()
    }

    /// Per-attempt timeout as an `Option`.
    #[inline]
    pub fn task_timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Maximum number of units outstanding in a pool with `workers` slots.
    ///
    /// The pool bounds running units on its own; when it has more slots than
    /// `concurrency`, the orchestrator bounds them instead and prefetch is ignored.
    #[inline]
    pub fn window(&self, workers: usize) -> usize {
        let n = self.concurrency.max(1);
        if workers <= n {
            n.saturating_add(self.prefetch)
        } else {
            n
        }
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a copy with a different concurrency bound.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// Returns a copy with a different failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns a copy with a different progress mode.
    pub fn with_progress(mut self, mode: ProgressMode) -> Self {
        self.progress = mode;
        self
    }
}

/// Number of CPUs available to the process (at least 1).
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

impl Default for RunConfig {
    /// Default configuration:
    ///
    /// - `concurrency` = available parallelism
    /// - `policy = CancelOnFailure`
    /// - `progress = None`, `prefetch = 0`, `timeout = 0s`
    /// - `backoff` = immediate retries
    /// - `max_adapter_failures = 3`, `bus_capacity = 1024`
    /// - `cancel_on_signal = false`
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            policy: FailurePolicy::default(),
            progress: ProgressMode::default(),
            prefetch: 0,
            timeout: Duration::ZERO,
            backoff: BackoffPolicy::default(),
            max_adapter_failures: 3,
            bus_capacity: 1024,
            cancel_on_signal: false,
            description: Cow::Borrowed(""),
        }
    }
}
