//! # batchvisor
//!
//! **Batchvisor** runs a batch of independent work items over a bounded pool of
//! workers and decides, through one uniform policy, what happens to the rest of
//! the batch when an item fails.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   Iterator<Arc<Work>>        RunConfig { concurrency, policy, progress, ... }
//!            │                         │
//!            ▼                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator::run                                                │
//! │  - Coordinator (single writer of unit state)                      │
//! │  - FailurePolicy engine  ─► CancelAll │ Retry │ Skip │ GiveUp     │
//! │  - CancellationController (policy, caller token, OS signal)       │
//! │  - ProgressAggregator ─► Reporter(s), watch::Receiver             │
//! └──────┬──────────────────────────────▲─────────────────────┬───────┘
//!        │ submit(Submission)           │ Started / Finished  │ publish(Event)
//!        ▼                              │                     ▼
//! ┌──────────────────────────────────────┴───┐   ┌──────────────────────────┐
//! │  WorkerPool (AsyncPool │ ThreadPool)     │   │  Bus ─► SubscriberSet    │
//! │  N numbered slots, cancel-if-not-started │   │   ─► LogWriter, custom   │
//! └──────────────────────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! ### Unit lifecycle
//! ```text
//! Pending ──► Running ──► Succeeded
//!    │           └──────► Failed ──► policy:
//!    │                                ├─ CancelOnFailure ─► Failed, cancel the rest
//!    │                                ├─ RetryUpTo(k)    ─► Running again (attempt + 1)
//!    │                                │                     or Failed once attempt > k
//!    │                                └─ SkipOnFailure   ─► Skipped
//!    └──(run cancelled before start)──► Cancelled
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                         |
//! |-------------------|----------------------------------------------------------|--------------------------------------------|
//! | **Orchestration** | Bounded concurrency, completion-ordered report.          | [`Orchestrator`], [`RunReport`]            |
//! | **Policies**      | Cancel, retry (with backoff/jitter) or skip on failure.  | [`FailurePolicy`], [`BackoffPolicy`]       |
//! | **Backends**      | Async tasks or blocking threads behind one trait.        | [`WorkerPool`], [`AsyncPool`], [`ThreadPool`] |
//! | **Work**          | Trait objects or closures.                               | [`Work`], [`BlockingWork`], [`WorkFn`]     |
//! | **Progress**      | Counters on a watch channel, pluggable reporters.        | [`ProgressCounters`], [`Reporter`]         |
//! | **Events**        | Lifecycle events fanned out to subscribers.              | [`Event`], [`Subscribe`]                   |
//! | **Errors**        | Typed errors with stable labels.                         | [`RunError`], [`TaskError`]                |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders events as `tracing` records.
//! - `indicatif`: exports [`BarFactory`], terminal progress bars.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use batchvisor::{
//!     AsyncPool, FailurePolicy, Orchestrator, ProgressMode, RunConfig, TaskError, TaskState, WorkFn,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = RunConfig::default()
//!         .with_concurrency(3)
//!         .with_policy(FailurePolicy::RetryUpTo(2))
//!         .with_progress(ProgressMode::SingleBar);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn batchvisor::Subscribe>> = vec![Arc::new(batchvisor::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn batchvisor::Subscribe>> = Vec::new();
//!
//!     let orch = Orchestrator::builder(cfg).with_subscribers(subs).build();
//!
//!     let tasks: Vec<_> = ["a", "b", "c"]
//!         .into_iter()
//!         .map(|name| {
//!             WorkFn::arc(name, move |ctx: CancellationToken| async move {
//!                 if ctx.is_cancelled() {
//!                     return Err(TaskError::Canceled);
//!                 }
//!                 Ok(name.len())
//!             })
//!         })
//!         .collect();
//!
//!     let report = orch.run(AsyncPool::new(3), tasks).await?;
//!     assert!(report.units().iter().all(|u| u.state() == TaskState::Succeeded));
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod pool;
mod progress;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use crate::config::{RunConfig, default_concurrency};
pub use crate::core::{
    CancelReason, CancelState, CancellationController, Orchestrator, OrchestratorBuilder,
    PartialReport, RunReport, RunSummary, TaskId, TaskState, TaskUnit, wait_for_shutdown_signal,
};
pub use crate::error::{AdapterError, ConfigError, RunError, TaskError};
pub use crate::events::{Bus, Event, EventKind};
pub use crate::policies::{BackoffPolicy, FailureContext, FailurePolicy, JitterPolicy, Verdict, decide};
pub use crate::pool::{AsyncPool, Outcome, PoolEvent, Submission, TaskHandle, ThreadPool, WorkerPool};
pub use crate::progress::{NoopFactory, NoopReporter, ProgressCounters, ProgressMode, Reporter, ReporterFactory};
pub use crate::subscribers::{Subscribe, SubscriberSet};
pub use crate::tasks::{BlockingFn, BlockingWork, Describe, Work, WorkFn};

// Optional: built-in tracing subscriber.
// Enable with: `--features logging` (default)
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;

// Optional: terminal progress bars.
// Enable with: `--features indicatif`
#[cfg(feature = "indicatif")]
pub use crate::progress::{BarFactory, BarReporter};
