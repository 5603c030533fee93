//! # Run report.
//!
//! A [`RunReport`] holds every unit created during a run, each exactly once and
//! in a terminal state, in the order the units became terminal.

use std::any::Any;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::core::cancel::CancelReason;
use crate::core::unit::{TaskState, TaskUnit};

/// Outcome counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

impl RunSummary {
    /// Total number of units.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.cancelled
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "succeeded={} failed={} skipped={} cancelled={}",
            self.succeeded, self.failed, self.skipped, self.cancelled
        )
    }
}

/// Final result set of [`Orchestrator::run`](crate::Orchestrator::run).
pub struct RunReport<W: ?Sized, T> {
    units: Vec<TaskUnit<W, T>>,
    cancel: Option<CancelReason>,
    elapsed: Duration,
}

impl<W: ?Sized, T> RunReport<W, T> {
    pub(crate) fn new(
        units: Vec<TaskUnit<W, T>>,
        cancel: Option<CancelReason>,
        elapsed: Duration,
    ) -> Self {
        Self {
            units,
            cancel,
            elapsed,
        }
    }

    /// Every unit, in completion order.
    pub fn units(&self) -> &[TaskUnit<W, T>] {
        &self.units
    }

    /// Whether the run was cancelled (by policy, caller, signal or pool exhaustion).
    pub fn cancelled(&self) -> bool {
        self.cancel.is_some()
    }

    /// What triggered cancellation, if anything did.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.cancel
    }

    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Units in `state`, in completion order.
    pub fn in_state(&self, state: TaskState) -> impl Iterator<Item = &TaskUnit<W, T>> {
        self.units.iter().filter(move |u| u.state() == state)
    }

    pub fn successes(&self) -> impl Iterator<Item = &TaskUnit<W, T>> {
        self.in_state(TaskState::Succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskUnit<W, T>> {
        self.in_state(TaskState::Failed)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &TaskUnit<W, T>> {
        self.in_state(TaskState::Skipped)
    }

    /// Units that never ran (or never re-ran) because of cancellation.
    pub fn cancelled_units(&self) -> impl Iterator<Item = &TaskUnit<W, T>> {
        self.in_state(TaskState::Cancelled)
    }

    pub fn summary(&self) -> RunSummary {
        let mut s = RunSummary::default();
        for u in &self.units {
            match u.state() {
                TaskState::Succeeded => s.succeeded += 1,
                TaskState::Failed => s.failed += 1,
                TaskState::Skipped => s.skipped += 1,
                TaskState::Cancelled => s.cancelled += 1,
                TaskState::Pending | TaskState::Running => {}
            }
        }
        s
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Consumes the report and returns the outputs of successful units, in completion order.
    pub fn into_results(self) -> Vec<T> {
        self.units
            .into_iter()
            .filter_map(TaskUnit::into_result)
            .collect()
    }

    /// Consumes the report and returns all units.
    pub fn into_units(self) -> Vec<TaskUnit<W, T>> {
        self.units
    }
}

impl<W: ?Sized, T: fmt::Debug> fmt::Debug for RunReport<W, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunReport")
            .field("summary", &self.summary())
            .field("cancel", &self.cancel)
            .field("elapsed", &self.elapsed)
            .field("units", &self.units)
            .finish()
    }
}

/// Report of a run that ended with [`RunError::AdapterExhausted`](crate::RunError).
///
/// Units finished before the pool gave out are kept. The report's type depends on
/// the pool, so it travels type-erased; [`take`](PartialReport::take) recovers it
/// with the pool's work and output types.
pub struct PartialReport {
    summary: RunSummary,
    report: Mutex<Option<Box<dyn Any + Send>>>,
}

impl PartialReport {
    pub(crate) fn new<W, T>(report: RunReport<W, T>) -> Self
    where
        W: ?Sized + Send + Sync + 'static,
        T: Send + 'static,
    {
        Self {
            summary: report.summary(),
            report: Mutex::new(Some(Box::new(report))),
        }
    }

    /// Outcome counts of the drained run.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Moves the report out. `None` if it was already taken or the types do not match.
    pub fn take<W: ?Sized + 'static, T: 'static>(&self) -> Option<RunReport<W, T>> {
        let mut held = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        match held.take()?.downcast::<RunReport<W, T>>() {
            Ok(report) => Some(*report),
            Err(other) => {
                *held = Some(other);
                None
            }
        }
    }
}

impl fmt::Debug for PartialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let taken = self
            .report
            .lock()
            .map_or(true, |held| held.is_none());
        f.debug_struct("PartialReport")
            .field("summary", &self.summary)
            .field("taken", &taken)
            .finish()
    }
}
