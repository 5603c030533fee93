//! # Runtime events emitted by the orchestrator.
//!
//! The [`EventKind`] enum classifies events across four groups:
//! - **Run events**: a run started, cancellation was requested, the run drained
//! - **Unit events**: submission, start, and the terminal or retry outcome of each unit
//! - **Pool events**: the worker pool refused a submission
//! - **Subscriber events**: a subscriber dropped an event or panicked
//!
//! Events carry a process-wide `seq` stamp. Subscribers see events in
//! publish order; `seq` lets sinks that merge streams put them back in order.
//!
//! ## Example
//! ```rust
//! use batchvisor::{Event, EventKind, TaskId};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task(TaskId::new(4), "resize-004.png")
//!     .with_attempt(2)
//!     .with_reason("decoder error");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task, Some(TaskId::new(4)));
//! assert_eq!(ev.reason.as_deref(), Some("decoder error"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::core::TaskId;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Run events ===
    /// A run began.
    ///
    /// Sets: `slot` (number of worker slots), `reason` (failure policy).
    RunStarted,

    /// The run entered cancellation.
    ///
    /// Sets: `reason` (what triggered it), `task` when a unit failure triggered it.
    CancelRequested,

    /// Every unit reached a terminal state; the run returns next.
    ///
    /// Sets: `reason` (summary of outcomes).
    RunDrained,

    // === Unit events ===
    /// A unit was created from the source and handed to the pool.
    ///
    /// Sets: `task`, `name`.
    TaskSubmitted,

    /// A worker slot picked the unit up.
    ///
    /// Sets: `task`, `name`, `attempt`, `slot`.
    TaskStarting,

    /// The unit succeeded.
    ///
    /// Sets: `task`, `name`, `attempt`.
    TaskSucceeded,

    /// An attempt failed.
    ///
    /// Sets: `task`, `name`, `attempt`, `reason`.
    TaskFailed,

    /// The unit failed for good (retries spent, not retryable, cancelling
    /// failure or refused submission).
    ///
    /// Sets: `task`, `name`, `attempt`, `reason`.
    TaskFailedFinal,

    /// The unit will be resubmitted.
    ///
    /// Sets: `task`, `name`, `attempt` (the failed one), `delay`.
    RetryScheduled,

    /// The unit failed and the policy skipped it.
    ///
    /// Sets: `task`, `name`, `attempt`, `reason`.
    TaskSkipped,

    /// The unit will never run because the run was cancelled.
    ///
    /// Sets: `task`, `name`.
    TaskCancelled,

    // === Pool events ===
    /// The pool refused a submission.
    ///
    /// Sets: `task`, `name`, `attempt`, `reason`.
    AdapterRejected,

    // === Subscriber events ===
    /// A subscriber queue refused an event.
    ///
    /// Sets: `name` (subscriber), `reason` (`full` or `closed`).
    SubscriberOverflow,

    /// A subscriber's handler panicked.
    ///
    /// Sets: `name` (subscriber), `reason` (panic message).
    SubscriberPanicked,
}

/// One lifecycle notification. Which optional fields are filled depends on
/// [`kind`](Event::kind); see the variant docs.
#[derive(Clone, Debug)]
pub struct Event {
    pub seq: u64,
    pub at: SystemTime,
    pub kind: EventKind,
    /// Unit the event is about.
    pub task: Option<TaskId>,
    /// Work item name, or subscriber name for subscriber events.
    pub name: Option<Arc<str>>,
    /// Attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Worker slot index (slot count for `RunStarted`).
    pub slot: Option<usize>,
    /// Backoff before the next attempt.
    pub delay: Option<Duration>,
    /// Error text, cancel cause or run summary.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Stamps a bare event of `kind`.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: NEXT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            name: None,
            attempt: None,
            slot: None,
            delay: None,
            reason: None,
        }
    }

    pub fn with_task(mut self, id: TaskId, name: impl Into<Arc<str>>) -> Self {
        self.task = Some(id);
        self.name = Some(name.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Diagnostic about a subscriber (`SubscriberOverflow` / `SubscriberPanicked`).
    pub(crate) fn about_subscriber(
        kind: EventKind,
        subscriber: &'static str,
        reason: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            name: Some(Arc::from(subscriber)),
            ..Event::new(kind).with_reason(reason)
        }
    }
}
