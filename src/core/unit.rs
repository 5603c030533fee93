//! # Task units: one submitted work item and its outcome record.
//!
//! ## State machine
//! ```text
//!            ┌──────────────► Cancelled ◄────────────┐
//!            │                                       │
//! Pending ───┼──► Running ──► Succeeded              │
//!            │       │                               │
//!            │       └──────► Failed ──► Running     │ (retry)
//!            │                  │   └──► Skipped     │
//!            └──(refused)──────►│   └──► Failed      │ (refused retry / terminal)
//!                               └────────────────────┘
//! ```
//!
//! Terminal states: `Succeeded`, `Skipped`, `Cancelled`, and `Failed` once the
//! orchestrator has finalized the unit.

use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;

/// Identifier assigned when a work item is pulled from the source.
///
/// Ids are 1-based and follow submission order; a unit keeps its id across retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle state of a [`TaskUnit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Created, waiting for a worker slot.
    #[default]
    Pending,
    /// Executing on a worker.
    Running,
    /// Finished without error.
    Succeeded,
    /// Last attempt failed (awaiting a verdict, or terminal once finalized).
    Failed,
    /// Failed and skipped by policy.
    Skipped,
    /// Never (re)started because the run was cancelled.
    Cancelled,
}

impl TaskState {
    /// Whether `self → next` is an edge of the lifecycle state machine.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Failed, Running)
                | (Failed, Failed)
                | (Failed, Skipped)
                | (Failed, Cancelled)
        )
    }

    /// Short lowercase name used in events and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Succeeded => "succeeded",
            TaskState::Failed => "failed",
            TaskState::Skipped => "skipped",
            TaskState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One work item plus everything the run learned about it.
pub struct TaskUnit<W: ?Sized, T> {
    id: TaskId,
    work: Arc<W>,
    attempt: u32,
    state: TaskState,
    result: Option<T>,
    error: Option<TaskError>,
}

impl<W: ?Sized, T> TaskUnit<W, T> {
    pub(crate) fn new(id: TaskId, work: Arc<W>) -> Self {
        Self {
            id,
            work,
            attempt: 0,
            state: TaskState::Pending,
            result: None,
            error: None,
        }
    }

    /// Stable identifier.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The caller's work item.
    pub fn work(&self) -> &Arc<W> {
        &self.work
    }

    /// Number of execution attempts made (refused submissions included).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Output of the successful attempt.
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Consumes the unit and returns its output, if it succeeded.
    pub fn into_result(self) -> Option<T> {
        self.result
    }

    /// Error of the last failed attempt (kept on skipped units as the cause).
    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    pub(crate) fn start(&mut self) {
        self.transition(TaskState::Running);
        self.attempt += 1;
        self.error = None;
    }

    pub(crate) fn succeed(&mut self, value: T) {
        self.transition(TaskState::Succeeded);
        self.result = Some(value);
    }

    pub(crate) fn fail(&mut self, error: TaskError) {
        self.transition(TaskState::Failed);
        self.error = Some(error);
    }

    /// Submission refused by the pool: counts as an attempt that failed before running.
    pub(crate) fn refuse(&mut self, error: TaskError) {
        self.transition(TaskState::Failed);
        self.attempt += 1;
        self.error = Some(error);
    }

    pub(crate) fn skip(&mut self) {
        self.transition(TaskState::Skipped);
    }

    pub(crate) fn cancel(&mut self) {
        self.transition(TaskState::Cancelled);
    }

    fn transition(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "{}: illegal transition {} -> {}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }
}

impl<W: ?Sized, T: fmt::Debug> fmt::Debug for TaskUnit<W, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskUnit")
            .field("id", &self.id)
            .field("attempt", &self.attempt)
            .field("state", &self.state)
            .field("result", &self.result)
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> TaskUnit<str, u32> {
        TaskUnit::new(TaskId::new(7), Arc::from("payload"))
    }

    #[test]
    fn retry_keeps_id_and_bumps_attempt() {
        let mut u = unit();
        u.start();
        u.fail(TaskError::fail("first"));
        assert_eq!(u.attempt(), 1);
        assert!(u.error().is_some());

        u.start();
        assert_eq!(u.attempt(), 2);
        assert!(u.error().is_none());
        u.succeed(5);

        assert_eq!(u.id(), TaskId::new(7));
        assert_eq!(u.state(), TaskState::Succeeded);
        assert_eq!(u.result(), Some(&5));
    }

    #[test]
    fn refused_submission_counts_as_attempt() {
        let mut u = unit();
        u.refuse(TaskError::Adapter(crate::error::AdapterError::Closed));
        assert_eq!(u.state(), TaskState::Failed);
        assert_eq!(u.attempt(), 1);
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        use TaskState::*;
        let all = [Pending, Running, Succeeded, Failed, Skipped, Cancelled];
        for from in [Succeeded, Skipped, Cancelled] {
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn running_cannot_be_cancelled() {
        assert!(!TaskState::Running.can_transition_to(TaskState::Cancelled));
        assert!(TaskState::Pending.can_transition_to(TaskState::Cancelled));
    }

    #[test]
    fn display_is_stable() {
        assert_eq!(TaskId::new(3).to_string(), "task-3");
        assert_eq!(TaskState::Skipped.to_string(), "skipped");
    }
}
