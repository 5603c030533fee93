//! # Progress sinks.
//!
//! The orchestrator never draws anything itself. It drives [`Reporter`]s made by
//! a [`ReporterFactory`]:
//!
//! ```text
//! ProgressMode::SingleBar     one reporter (slot = None), advanced per terminal unit
//! ProgressMode::PerWorkerBar  the combined reporter + one per worker slot;
//!                             a slot's reporter is reset when a unit starts on it
//!                             and advanced when that unit finishes
//! ```

/// One progress display.
///
/// Calls arrive from the orchestrator task only, in lifecycle order.
pub trait Reporter: Send {
    /// Advances the position by `n`.
    fn advance(&mut self, n: u64);

    /// Sets (or updates) the expected total.
    fn set_total(&mut self, total: u64);

    /// Resets position to zero (per-worker reporters, on each new unit).
    fn reset(&mut self) {}

    /// Shows a short message next to the display.
    fn set_message(&mut self, _msg: &str) {}

    /// Finishes the display. Called exactly once, after the last update.
    fn close(&mut self);
}

/// Builds reporters for a run.
pub trait ReporterFactory: Send + Sync {
    /// Creates a reporter.
    ///
    /// `slot` is `None` for the combined reporter and `Some(i)` for worker slot `i`.
    fn create(&self, slot: Option<usize>, description: &str) -> Box<dyn Reporter>;
}

/// Which reporters a run creates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressMode {
    /// No reporter is created; counters are still published.
    #[default]
    None,
    /// One combined reporter.
    SingleBar,
    /// One combined reporter plus one per worker slot.
    PerWorkerBar,
}

/// Reporter that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn advance(&mut self, _n: u64) {}
    fn set_total(&mut self, _total: u64) {}
    fn close(&mut self) {}
}

/// Factory producing [`NoopReporter`]s. Default when none is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFactory;

impl ReporterFactory for NoopFactory {
    fn create(&self, _slot: Option<usize>, _description: &str) -> Box<dyn Reporter> {
        Box::new(NoopReporter)
    }
}
