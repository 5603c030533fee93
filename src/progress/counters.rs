//! Snapshot of run progress.

/// Counters published after every lifecycle change.
///
/// `completed == succeeded + failed + skipped + cancelled` always holds, and
/// every counter except `running` only grows during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    /// Units pulled from the source so far.
    pub submitted: u64,
    /// Units currently executing on a worker.
    pub running: u64,
    /// Units in a terminal state.
    pub completed: u64,
    /// Terminal `Succeeded` units.
    pub succeeded: u64,
    /// Terminal `Failed` units.
    pub failed: u64,
    /// Terminal `Skipped` units.
    pub skipped: u64,
    /// Terminal `Cancelled` units.
    pub cancelled: u64,
    /// Total units, once known (size hint or source exhausted).
    pub total: Option<u64>,
}

impl ProgressCounters {
    /// Units not yet terminal, if the total is known.
    pub fn remaining(&self) -> Option<u64> {
        self.total.map(|t| t.saturating_sub(self.completed))
    }

    /// Completed fraction in `0.0..=1.0`, if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(t) => Some(self.completed as f64 / t as f64),
            None => None,
        }
    }
}
