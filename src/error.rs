//! Error types used by the batchvisor runtime and by work items.
//!
//! - [`RunError`]: the call to [`Orchestrator::run`](crate::Orchestrator::run) itself failed.
//! - [`ConfigError`]: the [`RunConfig`](crate::RunConfig) was rejected before anything ran.
//! - [`AdapterError`]: the worker pool refused a submission.
//! - [`TaskError`]: a single work item failed; recorded in the report, never unwound.
//!
//! Every enum exposes `as_label()`, a short stable snake_case string for logs and metrics.

use std::time::Duration;
use thiserror::Error;

use crate::core::PartialReport;

/// # Errors that abort a whole run.
///
/// Task-level failures never show up here: they are routed through the
/// failure policy and recorded in the [`RunReport`](crate::RunReport).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// The configuration was invalid; no task was submitted.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The worker pool refused too many submissions in a row, or stopped
    /// reporting on work it had accepted.
    ///
    /// In-flight units were drained before this error was returned; their
    /// outcomes are in `partial`.
    #[error("worker pool refused {failures} consecutive submissions; last error: {last}")]
    AdapterExhausted {
        /// Number of consecutive refusals observed.
        failures: usize,
        /// The last refusal reported by the pool.
        last: AdapterError,
        /// Every unit of the run, as far as it got.
        partial: PartialReport,
    },
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use batchvisor::{ConfigError, RunError};
    ///
    /// let err = RunError::from(ConfigError::ZeroConcurrency);
    /// assert_eq!(err.as_label(), "run_invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Config(_) => "run_invalid_config",
            RunError::AdapterExhausted { .. } => "run_adapter_exhausted",
        }
    }
}

/// # Rejected run parameters.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `concurrency` was zero.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    /// `max_adapter_failures` was zero, which would abort on the first refusal of nothing.
    #[error("max_adapter_failures must be at least 1")]
    ZeroAdapterFailureLimit,

    /// The retry backoff cannot produce sensible delays.
    #[error("invalid backoff: {reason}")]
    InvalidBackoff {
        /// What is wrong with the backoff parameters.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroConcurrency => "config_zero_concurrency",
            ConfigError::ZeroAdapterFailureLimit => "config_zero_adapter_failure_limit",
            ConfigError::InvalidBackoff { .. } => "config_invalid_backoff",
        }
    }
}

/// # A worker pool refused to accept a unit of work.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The pool was shut down.
    #[error("worker pool is closed")]
    Closed,

    /// The pool's queue limit was reached.
    #[error("worker pool saturated with {queued} queued units")]
    Saturated {
        /// Units accepted but not yet finished at the time of refusal.
        queued: usize,
    },

    /// Backend specific refusal.
    #[error("worker pool rejected submission: {reason}")]
    Rejected {
        /// Backend supplied message.
        reason: String,
    },
}

impl AdapterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AdapterError::Closed => "adapter_closed",
            AdapterError::Saturated { .. } => "adapter_saturated",
            AdapterError::Rejected { .. } => "adapter_rejected",
        }
    }
}

/// # Failure of a single work item attempt.
///
/// Retryable kinds are `Fail`, `Timeout` and `Adapter`; `Fatal` and `Panicked`
/// end the unit regardless of the retry budget.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The attempt exceeded the per-task timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable failure; never retried.
    #[error("fatal error (no retry): {reason}")]
    Fatal {
        /// The underlying error message.
        reason: String,
    },

    /// The attempt failed but may succeed if retried.
    #[error("execution failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// The work item panicked.
    #[error("panicked: {reason}")]
    Panicked {
        /// Panic payload rendered as text.
        reason: String,
    },

    /// The pool refused the submission for this unit.
    #[error("worker pool: {0}")]
    Adapter(#[from] AdapterError),

    /// The work observed its cancellation token and gave up.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TaskError::Fatal`].
    pub fn fatal(reason: impl Into<String>) -> Self {
        TaskError::Fatal {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use batchvisor::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Adapter(_) => "task_adapter_refused",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether another attempt could plausibly succeed.
    ///
    /// # Example
    /// ```
    /// use batchvisor::TaskError;
    ///
    /// assert!(TaskError::fail("boom").is_retryable());
    /// assert!(!TaskError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TaskError::Fail { .. } | TaskError::Timeout { .. } | TaskError::Adapter(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_errors_convert_into_retryable_task_errors() {
        let err: TaskError = AdapterError::Saturated { queued: 4 }.into();
        assert_eq!(err.as_label(), "task_adapter_refused");
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "worker pool: worker pool saturated with 4 queued units"
        );
    }

    #[test]
    fn panics_and_cancellation_are_not_retryable() {
        let panicked = TaskError::Panicked {
            reason: "index out of bounds".into(),
        };
        assert!(!panicked.is_retryable());
        assert!(!TaskError::Canceled.is_retryable());
    }

    #[test]
    fn run_error_wraps_config_error() {
        let err = RunError::from(ConfigError::InvalidBackoff {
            reason: "factor is NaN".into(),
        });
        assert_eq!(
            err.to_string(),
            "invalid configuration: invalid backoff: factor is NaN"
        );
        assert!(matches!(
            err,
            RunError::Config(ConfigError::InvalidBackoff { .. })
        ));
    }
}
