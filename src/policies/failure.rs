//! # Failure policy engine.
//!
//! [`decide`] is a pure function: given the run's [`FailurePolicy`] and a view of
//! the failed unit, it returns the [`Verdict`] the orchestrator acts on.
//!
//! ```text
//! CancelOnFailure  ─► CancelAll                      (unit ends Failed, run cancels)
//! SkipOnFailure    ─► Skip                           (unit ends Skipped)
//! RetryUpTo(k)     ─► Retry   while attempt <= k
//!                  └► GiveUp  once attempt > k       (unit ends Failed, run continues)
//! ```
//!
//! Under `RetryUpTo`, errors that are not retryable (see
//! [`TaskError::is_retryable`]) and work items that declare themselves
//! non re-entrant give up immediately.

use crate::error::TaskError;

/// Configured response to a task failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The first failure cancels every unit that has not started yet.
    #[default]
    CancelOnFailure,
    /// Retry a failing unit; `k` is the number of retries allowed after the first attempt.
    RetryUpTo(u32),
    /// Record the failing unit as skipped and keep going.
    SkipOnFailure,
}

/// What the orchestrator does with a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Finalize the unit as failed and cancel the rest of the run.
    CancelAll,
    /// Hand the unit back to the pool for another attempt.
    Retry,
    /// Finalize the unit as skipped.
    Skip,
    /// Finalize the unit as failed; the run continues.
    GiveUp,
}

/// The parts of a failed unit the engine looks at.
#[derive(Clone, Copy, Debug)]
pub struct FailureContext<'a> {
    /// Attempts made so far, including the one that just failed.
    pub attempt: u32,
    /// Why the attempt failed.
    pub error: &'a TaskError,
    /// Whether the work item may safely run again.
    pub reentrant: bool,
}

/// Decides the next step for a failed unit.
///
/// # Example
/// ```
/// use batchvisor::{decide, FailureContext, FailurePolicy, TaskError, Verdict};
///
/// let err = TaskError::fail("connection reset");
/// let ctx = FailureContext { attempt: 1, error: &err, reentrant: true };
/// assert_eq!(decide(FailurePolicy::RetryUpTo(2), &ctx), Verdict::Retry);
/// assert_eq!(decide(FailurePolicy::SkipOnFailure, &ctx), Verdict::Skip);
/// ```
pub fn decide(policy: FailurePolicy, failure: &FailureContext<'_>) -> Verdict {
    match policy {
        FailurePolicy::CancelOnFailure => Verdict::CancelAll,
        FailurePolicy::SkipOnFailure => Verdict::Skip,
        FailurePolicy::RetryUpTo(retries) => {
            if !failure.reentrant || !failure.error.is_retryable() {
                Verdict::GiveUp
            } else if failure.attempt <= retries {
                Verdict::Retry
            } else {
                Verdict::GiveUp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(attempt: u32, error: &TaskError) -> FailureContext<'_> {
        FailureContext {
            attempt,
            error,
            reentrant: true,
        }
    }

    #[test]
    fn cancel_policy_always_cancels() {
        let err = TaskError::fail("x");
        for attempt in 1..4 {
            assert_eq!(
                decide(FailurePolicy::CancelOnFailure, &ctx(attempt, &err)),
                Verdict::CancelAll
            );
        }
    }

    #[test]
    fn skip_policy_skips_even_fatal_errors() {
        let err = TaskError::fatal("corrupt input");
        assert_eq!(decide(FailurePolicy::SkipOnFailure, &ctx(1, &err)), Verdict::Skip);
    }

    #[test]
    fn retry_budget_counts_attempts() {
        let err = TaskError::fail("flaky");
        let policy = FailurePolicy::RetryUpTo(2);
        assert_eq!(decide(policy, &ctx(1, &err)), Verdict::Retry);
        assert_eq!(decide(policy, &ctx(2, &err)), Verdict::Retry);
        assert_eq!(decide(policy, &ctx(3, &err)), Verdict::GiveUp);
    }

    #[test]
    fn zero_retries_gives_up_on_first_failure() {
        let err = TaskError::fail("flaky");
        assert_eq!(decide(FailurePolicy::RetryUpTo(0), &ctx(1, &err)), Verdict::GiveUp);
    }

    #[test]
    fn fatal_errors_are_not_retried() {
        let err = TaskError::fatal("bad schema");
        assert_eq!(decide(FailurePolicy::RetryUpTo(5), &ctx(1, &err)), Verdict::GiveUp);
    }

    #[test]
    fn non_reentrant_work_is_not_retried() {
        let err = TaskError::fail("flaky");
        let failure = FailureContext {
            attempt: 1,
            error: &err,
            reentrant: false,
        };
        assert_eq!(decide(FailurePolicy::RetryUpTo(3), &failure), Verdict::GiveUp);
    }
}
