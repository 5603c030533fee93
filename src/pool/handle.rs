//! # Handle to a submitted unit.
//!
//! A [`TaskHandle`] is shared between the coordinator and the pool job that
//! executes the unit. Its start/cancel race is settled by one atomic
//! compare-and-swap on the handle state:
//!
//! ```text
//! Queued ──try_start()──────────────► Started     (job wins: unit runs)
//!    └────cancel_if_not_started()───► Cancelled   (coordinator wins: unit never runs)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

use crate::core::TaskId;

const QUEUED: u8 = 0;
const STARTED: u8 = 1;
const CANCELLED: u8 = 2;

/// Coordinator-side handle for one submission.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: TaskId,
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl TaskHandle {
    /// Creates a queued handle whose wait for a worker is aborted by `token`.
    pub fn new(id: TaskId, token: CancellationToken) -> Self {
        Self {
            id,
            state: Arc::new(AtomicU8::new(QUEUED)),
            token,
        }
    }

    /// Id of the submitted unit.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Prevents the unit from starting if no worker picked it up yet.
    ///
    /// Returns `true` when the unit is guaranteed never to run. Returns `false`
    /// if it already started (it will finish naturally) or was cancelled before.
    pub fn cancel_if_not_started(&self) -> bool {
        let won = self
            .state
            .compare_exchange(QUEUED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.token.cancel();
        }
        won
    }

    /// Whether a worker has started executing the unit.
    pub fn is_started(&self) -> bool {
        self.state.load(Ordering::Acquire) == STARTED
    }

    /// Claims the unit for execution; fails if it was cancelled first.
    pub fn try_start(&self) -> bool {
        self.state
            .compare_exchange(QUEUED, STARTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Token cancelled when the unit must stop waiting for a worker.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_before_start_wins() {
        let h = TaskHandle::new(TaskId::new(1), CancellationToken::new());
        assert!(h.cancel_if_not_started());
        assert!(h.token().is_cancelled());
        assert!(!h.try_start());
        assert!(!h.is_started());
    }

    #[test]
    fn cancel_after_start_is_refused() {
        let h = TaskHandle::new(TaskId::new(2), CancellationToken::new());
        assert!(h.try_start());
        assert!(!h.cancel_if_not_started());
        assert!(!h.token().is_cancelled());
        assert!(h.is_started());
    }

    #[test]
    fn second_cancel_is_a_no_op() {
        let h = TaskHandle::new(TaskId::new(3), CancellationToken::new());
        assert!(h.cancel_if_not_started());
        assert!(!h.cancel_if_not_started());
    }
}
