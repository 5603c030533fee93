//! # Run coordinator.
//!
//! One [`Coordinator`] drives one run. It is the only writer of unit state,
//! progress counters and the cancellation flag; workers talk back exclusively
//! through [`WorkerPool::next_event`].
//!
//! ```text
//!            ┌──────────── fill() ◄──────────────────────────────────────┐
//!            │  ready units first, then the source, while                │
//!            │  outstanding < window, pool not saturated, not cancelling │
//!            ▼                                                           │
//!      pool.submit ──Saturated──► back to the front of `ready`           │
//!            │      ──refused────► on_failure                            │
//!            ▼                                                           │
//! select { pool.next_event, backoff expiry, caller token, OS signal } ───┘
//!            │
//!            ├─ Started  ─► Running
//!            └─ Finished ─► Succeeded │ on_failure │ Cancelled (never started)
//!
//! on_failure ─► decide() ─► CancelAll │ Retry (backoff queue) │ Skip │ GiveUp
//! ```
//!
//! Units waiting out a retry backoff sit in a `DelayQueue` outside the
//! submission window and are handed to the pool only once due.
//!
//! The loop ends when nothing is outstanding. A cancelled run then drains the
//! rest of the source into `Cancelled` units, so every item becomes exactly one
//! report entry.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::core::cancel::{CancelReason, CancellationController};
use crate::core::shutdown::wait_for_shutdown_signal;
use crate::core::unit::{TaskId, TaskState, TaskUnit};
use crate::error::{AdapterError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::{FailureContext, Verdict, decide};
use crate::pool::{Outcome, PoolEvent, Submission, TaskHandle, WorkerPool};
use crate::progress::ProgressAggregator;
use crate::tasks::Describe;

type Unit<P> = TaskUnit<<P as WorkerPool>::Work, <P as WorkerPool>::Output>;

/// What a finished run hands back to the orchestrator.
pub(crate) struct Drained<P: WorkerPool> {
    pub units: Vec<Unit<P>>,
    pub cancel: Option<CancelReason>,
    pub exhausted: Option<(usize, AdapterError)>,
}

pub(crate) struct Coordinator<'a, P: WorkerPool> {
    cfg: &'a RunConfig,
    pool: P,
    bus: &'a Bus,
    external: &'a CancellationToken,
    progress: ProgressAggregator<'a>,
    cancel: CancellationController,

    live: HashMap<TaskId, Unit<P>>,
    handles: HashMap<TaskId, TaskHandle>,
    ready: VecDeque<TaskId>,
    backoff: DelayQueue<TaskId>,
    done: Vec<Unit<P>>,

    next_id: u64,
    window: usize,
    outstanding: usize,
    saturated: bool,
    source_done: bool,
    refusals: usize,
    exhausted: Option<(usize, AdapterError)>,
}

impl<'a, P: WorkerPool> Coordinator<'a, P> {
    pub(crate) fn new(
        cfg: &'a RunConfig,
        pool: P,
        bus: &'a Bus,
        external: &'a CancellationToken,
        progress: ProgressAggregator<'a>,
    ) -> Self {
        let window = cfg.window(pool.workers());
        Self {
            cfg,
            pool,
            bus,
            external,
            progress,
            cancel: CancellationController::new(),
            live: HashMap::new(),
            handles: HashMap::new(),
            ready: VecDeque::new(),
            backoff: DelayQueue::new(),
            done: Vec::new(),
            next_id: 1,
            window,
            outstanding: 0,
            saturated: false,
            source_done: false,
            refusals: 0,
            exhausted: None,
        }
    }

    /// Runs until every unit pulled from `source` is terminal.
    pub(crate) async fn run<I>(mut self, mut source: I) -> Drained<P>
    where
        I: Iterator<Item = Arc<P::Work>>,
    {
        let (lower, upper) = source.size_hint();
        if upper == Some(lower) {
            self.progress.set_total(lower as u64);
        }

        let listen = self.cfg.cancel_on_signal;
        let signal = async move {
            if listen {
                wait_for_shutdown_signal().await
            } else {
                std::future::pending().await
            }
        };
        tokio::pin!(signal);
        let mut signal_armed = listen;

        loop {
            if !self.cancel.is_requested() && self.external.is_cancelled() {
                self.request_cancel(CancelReason::External);
            }
            self.fill(&mut source);
            if self.outstanding == 0 && self.backoff.is_empty() {
                break;
            }

            let cancelling = self.cancel.is_requested();
            let waiting = self.outstanding > 0;
            let backing_off = !self.backoff.is_empty();
            tokio::select! {
                ev = self.pool.next_event(), if waiting => match ev {
                    Some(ev) => self.on_event(ev),
                    None => self.pool_lost(),
                },
                Some(due) = self.backoff.next(), if backing_off => {
                    self.ready.push_back(due.into_inner());
                }
                _ = self.external.cancelled(), if !cancelling => {
                    self.request_cancel(CancelReason::External);
                }
                sig = &mut signal, if signal_armed && !cancelling => {
                    signal_armed = false;
                    match sig {
                        Ok(name) => self.request_cancel(CancelReason::Signal(name)),
                        Err(e) => warn!(error = %e, "cannot listen for OS signals"),
                    }
                }
            }
        }

        if self.cancel.is_requested() {
            for work in source {
                let id = self.create(work);
                self.finalize_with(id, |u| u.cancel());
            }
        }
        self.progress.set_total(self.next_id - 1);
        self.pool.shutdown();
        self.cancel.mark_drained();
        self.progress.close();

        Drained {
            units: self.done,
            cancel: self.cancel.reason(),
            exhausted: self.exhausted,
        }
    }

    fn fill<I>(&mut self, source: &mut I)
    where
        I: Iterator<Item = Arc<P::Work>>,
    {
        while !self.cancel.is_requested() && !self.saturated && self.outstanding < self.window {
            if let Some(id) = self.ready.pop_front() {
                self.submit(id);
                continue;
            }
            if self.source_done {
                break;
            }
            match source.next() {
                Some(work) => {
                    let id = self.create(work);
                    self.submit(id);
                }
                None => {
                    self.source_done = true;
                    self.progress.set_total(self.next_id - 1);
                }
            }
        }
    }

    fn create(&mut self, work: Arc<P::Work>) -> TaskId {
        let id = TaskId::new(self.next_id);
        self.next_id += 1;
        self.bus
            .publish(Event::new(EventKind::TaskSubmitted).with_task(id, work.name()));
        self.live.insert(id, TaskUnit::new(id, work));
        self.progress.on_submitted();
        id
    }

    fn submit(&mut self, id: TaskId) {
        let Some(unit) = self.live.get_mut(&id) else {
            return;
        };
        let submission = Submission {
            id,
            attempt: unit.attempt() + 1,
            work: Arc::clone(unit.work()),
            timeout: self.cfg.task_timeout(),
        };

        match self.pool.submit(submission) {
            Ok(handle) => {
                self.refusals = 0;
                self.outstanding += 1;
                self.handles.insert(id, handle);
            }
            // a busy pool takes the unit later: no attempt, no refusal
            Err(AdapterError::Saturated { queued }) if self.outstanding > 0 => {
                debug!(task = %id, queued, "pool saturated, unit held back");
                self.saturated = true;
                self.ready.push_front(id);
            }
            Err(err) => {
                self.refusals += 1;
                unit.refuse(TaskError::Adapter(err.clone()));
                warn!(task = %id, attempt = unit.attempt(), error = %err, "pool refused submission");
                self.bus.publish(
                    Event::new(EventKind::AdapterRejected)
                        .with_task(id, unit.work().name())
                        .with_attempt(unit.attempt())
                        .with_reason(err.to_string()),
                );
                let exhausted = self.refusals >= self.cfg.max_adapter_failures;
                if exhausted {
                    self.exhausted = Some((self.refusals, err));
                }
                self.on_failure(id);
                if exhausted {
                    self.request_cancel(CancelReason::AdapterExhausted);
                }
            }
        }
    }

    fn on_event(&mut self, ev: PoolEvent<P::Output>) {
        match ev {
            PoolEvent::Started { id, slot } => {
                let Some(unit) = self.live.get_mut(&id) else {
                    return;
                };
                unit.start();
                debug!(task = %id, attempt = unit.attempt(), slot, "unit running");
                self.progress.on_started(slot, unit.work().name());
                self.bus.publish(
                    Event::new(EventKind::TaskStarting)
                        .with_task(id, unit.work().name())
                        .with_attempt(unit.attempt())
                        .with_slot(slot),
                );
            }
            PoolEvent::Finished { id, slot, outcome } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                self.saturated = false;
                self.handles.remove(&id);
                if let Some(slot) = slot {
                    self.progress.on_finished(slot);
                }
                match outcome {
                    Outcome::Success(value) => self.finalize_with(id, |u| u.succeed(value)),
                    Outcome::Failure(err) => self.on_attempt_failed(id, err),
                    Outcome::NotStarted if self.cancel.is_requested() => {
                        self.finalize_with(id, |u| u.cancel());
                    }
                    Outcome::NotStarted => {
                        // dropped by the pool on its own
                        if let Some(unit) = self.live.get_mut(&id) {
                            unit.refuse(TaskError::Adapter(AdapterError::Closed));
                        }
                        self.on_failure(id);
                    }
                }
            }
        }
    }

    fn on_attempt_failed(&mut self, id: TaskId, err: TaskError) {
        let Some(unit) = self.live.get_mut(&id) else {
            return;
        };
        debug!(task = %id, attempt = unit.attempt(), error = %err, "attempt failed");
        self.bus.publish(
            Event::new(EventKind::TaskFailed)
                .with_task(id, unit.work().name())
                .with_attempt(unit.attempt())
                .with_reason(err.to_string()),
        );
        unit.fail(err);
        self.on_failure(id);
    }

    /// Consults the failure policy for a unit sitting in `Failed`.
    fn on_failure(&mut self, id: TaskId) {
        let Some(unit) = self.live.get(&id) else {
            return;
        };
        let Some(error) = unit.error() else {
            return;
        };
        let attempt = unit.attempt();
        let verdict = decide(
            self.cfg.policy,
            &FailureContext {
                attempt,
                error,
                reentrant: unit.work().reentrant(),
            },
        );

        match verdict {
            Verdict::CancelAll => {
                info!(task = %id, attempt, "failure cancels the run");
                self.finalize(id);
                self.request_cancel(CancelReason::TaskFailure(id));
            }
            Verdict::Retry if self.cancel.is_requested() => {
                self.finalize_with(id, |u| u.cancel());
            }
            Verdict::Retry => {
                let delay = self.cfg.backoff.delay(attempt.saturating_sub(1));
                info!(task = %id, attempt, delay_ms = delay.as_millis() as u64, "retry scheduled");
                self.bus.publish(
                    Event::new(EventKind::RetryScheduled)
                        .with_task(id, unit.work().name())
                        .with_attempt(attempt)
                        .with_delay(delay),
                );
                if delay.is_zero() {
                    self.ready.push_back(id);
                } else {
                    self.backoff.insert(id, delay);
                }
            }
            Verdict::Skip => {
                info!(task = %id, attempt, "failed unit skipped");
                self.finalize_with(id, |u| u.skip());
            }
            Verdict::GiveUp => {
                info!(task = %id, attempt, "unit failed for good");
                self.finalize(id);
            }
        }
    }

    fn request_cancel(&mut self, reason: CancelReason) {
        if !self.cancel.request_cancel(reason) {
            return;
        }
        info!(%reason, in_flight = self.outstanding, "cancel requested");
        let mut ev = Event::new(EventKind::CancelRequested).with_reason(reason.to_string());
        if let CancelReason::TaskFailure(id) = reason {
            ev.task = Some(id);
        }
        self.bus.publish(ev);

        let mut stopped = 0usize;
        for handle in self.handles.values() {
            if handle.cancel_if_not_started() {
                stopped += 1;
            }
        }
        debug!(stopped, "queued units will not start");

        // held back or backing off: never handed to the pool again
        self.ready.clear();
        self.backoff.clear();
        let idle: Vec<TaskId> = self
            .live
            .keys()
            .filter(|id| !self.handles.contains_key(*id))
            .copied()
            .collect();
        for id in idle {
            self.finalize_with(id, |u| u.cancel());
        }
    }

    /// The pool stopped delivering events: outstanding units cannot be accounted for.
    fn pool_lost(&mut self) {
        warn!(outstanding = self.outstanding, "worker pool stopped delivering events");
        if self.exhausted.is_none() {
            self.exhausted = Some((self.refusals, AdapterError::Closed));
        }
        self.request_cancel(CancelReason::AdapterExhausted);

        let ids: Vec<TaskId> = self.handles.drain().map(|(id, _)| id).collect();
        for id in ids {
            let running = self
                .live
                .get(&id)
                .is_some_and(|u| u.state() == TaskState::Running);
            if running {
                self.finalize_with(id, |u| u.fail(TaskError::Adapter(AdapterError::Closed)));
            } else {
                self.finalize_with(id, |u| u.cancel());
            }
        }
        self.outstanding = 0;
    }

    fn finalize_with(&mut self, id: TaskId, f: impl FnOnce(&mut Unit<P>)) {
        if let Some(unit) = self.live.get_mut(&id) {
            f(unit);
            self.finalize(id);
        }
    }

    /// Moves a terminal unit into the report.
    fn finalize(&mut self, id: TaskId) {
        let Some(unit) = self.live.remove(&id) else {
            return;
        };
        let state = unit.state();
        let kind = match state {
            TaskState::Succeeded => Some(EventKind::TaskSucceeded),
            TaskState::Skipped => Some(EventKind::TaskSkipped),
            TaskState::Cancelled => Some(EventKind::TaskCancelled),
            TaskState::Failed => Some(EventKind::TaskFailedFinal),
            TaskState::Pending | TaskState::Running => None,
        };
        if let Some(kind) = kind {
            let mut ev = Event::new(kind)
                .with_task(id, unit.work().name())
                .with_attempt(unit.attempt());
            if let Some(err) = unit.error() {
                ev = ev.with_reason(err.to_string());
            }
            self.bus.publish(ev);
        }
        self.progress.on_terminal(state);
        self.done.push(unit);
    }
}
