//! # Orchestrator: runs a batch of work items over a worker pool.
//!
//! The [`Orchestrator`] owns the run configuration, the reporter factory, the
//! event subscribers and a caller-facing cancellation token. Each call to
//! [`Orchestrator::run`] builds a fresh event bus, subscriber fan-out and
//! progress aggregator, then hands control to the run coordinator.
//!
//! ## High-level architecture
//! ```text
//! run(pool, tasks)
//!   ├─ cfg.validate()                    ConfigError → RunError::Config, nothing submitted
//!   ├─ Bus::new ─► forwarder task ─► SubscriberSet::emit  (only if subscribers exist)
//!   ├─ ProgressAggregator (reporters per ProgressMode, watch channel)
//!   └─ Coordinator::run
//!         submit ─► WorkerPool ─► Started / Finished ─► policy ─► report
//!
//! Cancellation sources, all routed through one controller:
//!   CancelOnFailure verdict │ cancel_token().cancel() │ OS signal │ pool exhaustion
//! ```
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use batchvisor::{AsyncPool, FailurePolicy, Orchestrator, RunConfig, TaskError, WorkFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = RunConfig::default()
//!         .with_concurrency(4)
//!         .with_policy(FailurePolicy::SkipOnFailure);
//!     let orch = Orchestrator::new(cfg);
//!
//!     let tasks: Vec<_> = (1..=10u64)
//!         .map(|n| {
//!             WorkFn::arc(format!("square-{n}"), move |_ctx: CancellationToken| async move {
//!                 if n == 7 { Err(TaskError::fail("unlucky")) } else { Ok(n * n) }
//!             })
//!         })
//!         .collect();
//!
//!     let report = orch.run(AsyncPool::new(4), tasks).await?;
//!     assert_eq!(report.summary().succeeded, 9);
//!     assert_eq!(report.summary().skipped, 1);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::core::builder::OrchestratorBuilder;
use crate::core::coordinator::Coordinator;
use crate::core::report::{PartialReport, RunReport};
use crate::error::RunError;
use crate::events::{Bus, Event, EventKind};
use crate::pool::WorkerPool;
use crate::progress::{ProgressAggregator, ProgressCounters, ReporterFactory};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Drives batches of work items through a [`WorkerPool`].
pub struct Orchestrator {
    cfg: RunConfig,
    reporters: Arc<dyn ReporterFactory>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    cancel: CancellationToken,
    progress: watch::Sender<ProgressCounters>,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    pub fn builder(cfg: RunConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    /// Creates an orchestrator without reporters or subscribers.
    pub fn new(cfg: RunConfig) -> Self {
        Self::builder(cfg).build()
    }

    pub(crate) fn new_internal(
        cfg: RunConfig,
        reporters: Arc<dyn ReporterFactory>,
        subscribers: Vec<Arc<dyn Subscribe>>,
        cancel: CancellationToken,
    ) -> Self {
        let (progress, _rx) = watch::channel(ProgressCounters::default());
        Self {
            cfg,
            reporters,
            subscribers,
            cancel,
            progress,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    /// Token that cancels the current (and every later) run when cancelled.
    ///
    /// Queued units never start; running units finish and are recorded.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Live progress counters of the current or last run.
    pub fn progress(&self) -> watch::Receiver<ProgressCounters> {
        self.progress.subscribe()
    }

    /// Runs every item of `tasks` on `pool` and returns once all of them are terminal.
    ///
    /// Individual failures never make this call fail; they are handled by the
    /// failure policy and recorded in the report. The call itself fails only on
    /// an invalid configuration (nothing is submitted) or when the pool keeps
    /// refusing submissions (in-flight units are drained first).
    ///
    /// Lazily produced sources are supported but must be finite: after a
    /// cancellation the remaining items are pulled and recorded as cancelled.
    pub async fn run<P, I>(
        &self,
        pool: P,
        tasks: I,
    ) -> Result<RunReport<P::Work, P::Output>, RunError>
    where
        P: WorkerPool,
        I: IntoIterator<Item = Arc<P::Work>>,
    {
        self.cfg.validate()?;
        let started = tokio::time::Instant::now();

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let forwarder = self.spawn_forwarder(&bus);

        let workers = pool.workers();
        info!(
            concurrency = self.cfg.concurrency,
            workers,
            policy = ?self.cfg.policy,
            "run started"
        );
        bus.publish(
            Event::new(EventKind::RunStarted)
                .with_slot(workers.min(self.cfg.concurrency))
                .with_reason(format!("{:?}", self.cfg.policy)),
        );

        let progress = ProgressAggregator::new(
            self.cfg.progress,
            workers.min(self.cfg.concurrency),
            &self.cfg.description,
            self.reporters.as_ref(),
            &self.progress,
        );
        let drained = Coordinator::new(&self.cfg, pool, &bus, &self.cancel, progress)
            .run(tasks.into_iter())
            .await;

        let report = RunReport::new(drained.units, drained.cancel, started.elapsed());
        let summary = report.summary();
        info!(%summary, cancelled = report.cancelled(), "run drained");
        bus.publish(Event::new(EventKind::RunDrained).with_reason(summary.to_string()));

        if let Some((stop, handle)) = forwarder {
            stop.cancel();
            let _ = handle.await;
        }

        match drained.exhausted {
            Some((failures, last)) => Err(RunError::AdapterExhausted {
                failures,
                last,
                partial: PartialReport::new(report),
            }),
            None => Ok(report),
        }
    }

    /// Forwards bus events to the subscribers until `stop` fires, then drains the rest.
    fn spawn_forwarder(&self, bus: &Bus) -> Option<(CancellationToken, JoinHandle<()>)> {
        if self.subscribers.is_empty() {
            return None;
        }
        let set = SubscriberSet::new(self.subscribers.clone(), bus.clone());
        let mut rx = bus.subscribe();
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "event forwarder lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stopped.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(ev),
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown().await;
            debug!("event forwarder stopped");
        });
        Some((stop, handle))
    }
}
