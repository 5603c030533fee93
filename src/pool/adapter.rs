//! # Worker pool capability.
//!
//! The orchestrator talks to workers only through [`WorkerPool`]:
//!
//! ```text
//! Coordinator                                   WorkerPool
//!   submit(Submission) ───────────────────────►  queue job, return TaskHandle
//!   handle.cancel_if_not_started() ───────────►  job never starts
//!   next_event().await ◄──────────────────────   Started { id, slot }
//!                      ◄──────────────────────   Finished { id, slot, outcome }
//! ```
//!
//! ## Rules
//! - Every accepted submission produces exactly one `Finished` event.
//! - `Started` precedes `Finished` for units that ran; units that never ran
//!   finish with [`Outcome::NotStarted`] and no `Started`.
//! - At most [`WorkerPool::workers`] units are between `Started` and `Finished`,
//!   and a slot index is not reused before the `Finished` of its previous unit.
//! - Workers never touch coordinator state; events are the only channel back.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::TaskId;
use crate::error::{AdapterError, TaskError};
use crate::pool::handle::TaskHandle;
use crate::tasks::Describe;

/// One attempt handed to the pool.
pub struct Submission<W: ?Sized> {
    /// Unit id, echoed back in events.
    pub id: TaskId,
    /// Attempt number this execution will have (1-based).
    pub attempt: u32,
    /// The work item.
    pub work: Arc<W>,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
}

/// How an accepted submission ended.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The work returned a value.
    Success(T),
    /// The work failed, timed out or panicked.
    Failure(TaskError),
    /// The unit was cancelled before a worker picked it up.
    NotStarted,
}

/// Notification from the pool to the coordinator.
#[derive(Debug)]
pub enum PoolEvent<T> {
    /// A worker slot picked the unit up.
    Started {
        /// Unit id.
        id: TaskId,
        /// Worker slot index in `0..workers()`.
        slot: usize,
    },
    /// The submission is over.
    Finished {
        /// Unit id.
        id: TaskId,
        /// Slot the unit ran on, `None` if it never started.
        slot: Option<usize>,
        /// Result of the attempt.
        outcome: Outcome<T>,
    },
}

/// Uniform submit/wait/cancel interface over a concurrent backend.
#[async_trait]
pub trait WorkerPool: Send {
    /// Work item type this backend executes.
    type Work: ?Sized + Describe + Send + Sync + 'static;
    /// Value produced by successful work.
    type Output: Send + 'static;

    /// Number of worker slots (maximum units running at once).
    fn workers(&self) -> usize;

    /// Accepts one attempt for execution.
    fn submit(&mut self, submission: Submission<Self::Work>) -> Result<TaskHandle, AdapterError>;

    /// Waits for the next event. Returns `None` only if the pool can no longer
    /// deliver events for outstanding submissions.
    async fn next_event(&mut self) -> Option<PoolEvent<Self::Output>>;

    /// Stops accepting work and cancels everything still queued.
    fn shutdown(&mut self);
}
