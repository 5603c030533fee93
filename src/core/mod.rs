//! Orchestration core.
//!
//! - [`unit`]: task ids, lifecycle states, unit records;
//! - [`cancel`]: single-writer cancellation controller;
//! - [`coordinator`]: the run loop (submission window, events, policy verdicts);
//! - [`orchestrator`]: public entry point, event bus and subscriber wiring;
//! - [`report`]: the run's final result set;
//! - [`shutdown`]: OS signal listening.

mod builder;
mod cancel;
mod coordinator;
mod orchestrator;
mod report;
mod shutdown;
mod unit;

pub use builder::OrchestratorBuilder;
pub use cancel::{CancelReason, CancelState, CancellationController};
pub use orchestrator::Orchestrator;
pub use report::{PartialReport, RunReport, RunSummary};
pub use shutdown::wait_for_shutdown_signal;
pub use unit::{TaskId, TaskState, TaskUnit};
