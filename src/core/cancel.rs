//! # Run cancellation state.
//!
//! ```text
//! Running ──request_cancel()──► CancelRequested ──mark_drained()──► Drained
//!    └──────────────────────────mark_drained()────────────────────────┘
//! ```
//!
//! The controller is owned by the coordinator and is its only writer. Only the
//! first `request_cancel` counts; later calls return `false` and keep the
//! original reason.

use std::fmt;

use crate::core::TaskId;

/// Phase of a run with respect to cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelState {
    /// No cancellation requested.
    #[default]
    Running,
    /// No new units start; in-flight units finish naturally.
    CancelRequested,
    /// Every unit is terminal.
    Drained,
}

/// What triggered cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A unit failed under `CancelOnFailure`.
    TaskFailure(TaskId),
    /// The caller cancelled the orchestrator's token.
    External,
    /// An OS termination signal arrived.
    Signal(&'static str),
    /// The pool refused too many submissions in a row.
    AdapterExhausted,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::TaskFailure(id) => write!(f, "{id} failed"),
            CancelReason::External => f.write_str("cancelled by caller"),
            CancelReason::Signal(sig) => write!(f, "received {sig}"),
            CancelReason::AdapterExhausted => f.write_str("worker pool keeps refusing submissions"),
        }
    }
}

/// Single-writer cancellation flag for one run.
#[derive(Debug, Default)]
pub struct CancellationController {
    state: CancelState,
    reason: Option<CancelReason>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Returns `true` only for the call that flipped the flag.
    pub fn request_cancel(&mut self, reason: CancelReason) -> bool {
        if self.state != CancelState::Running {
            return false;
        }
        self.state = CancelState::CancelRequested;
        self.reason = Some(reason);
        true
    }

    pub fn is_requested(&self) -> bool {
        self.reason.is_some()
    }

    /// Records that every unit is terminal.
    pub fn mark_drained(&mut self) {
        self.state = CancelState::Drained;
    }

    pub fn state(&self) -> CancelState {
        self.state
    }

    /// Reason of the first cancellation request.
    pub fn reason(&self) -> Option<CancelReason> {
        self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_request_counts() {
        let mut c = CancellationController::new();
        assert!(c.request_cancel(CancelReason::TaskFailure(TaskId::new(3))));
        assert!(!c.request_cancel(CancelReason::External));
        assert_eq!(c.state(), CancelState::CancelRequested);
        assert_eq!(c.reason(), Some(CancelReason::TaskFailure(TaskId::new(3))));
    }

    #[test]
    fn drained_run_ignores_late_requests() {
        let mut c = CancellationController::new();
        c.mark_drained();
        assert!(!c.request_cancel(CancelReason::Signal("SIGTERM")));
        assert!(!c.is_requested());
        assert_eq!(c.state(), CancelState::Drained);
    }

    #[test]
    fn reason_renders_for_logs() {
        assert_eq!(CancelReason::TaskFailure(TaskId::new(9)).to_string(), "task-9 failed");
        assert_eq!(CancelReason::Signal("SIGINT").to_string(), "received SIGINT");
    }
}
