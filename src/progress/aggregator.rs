//! # Progress aggregation.
//!
//! [`ProgressAggregator`] is the single writer of [`ProgressCounters`]. It is
//! owned by the coordinator and updated on every lifecycle change; after each
//! update the counters are published on a `watch` channel and forwarded to the
//! configured reporters.

use tokio::sync::watch;

use crate::core::TaskState;
use crate::progress::counters::ProgressCounters;
use crate::progress::reporter::{ProgressMode, Reporter, ReporterFactory};

pub(crate) struct ProgressAggregator<'a> {
    counters: ProgressCounters,
    combined: Option<Box<dyn Reporter>>,
    workers: Vec<Box<dyn Reporter>>,
    publish: &'a watch::Sender<ProgressCounters>,
}

impl<'a> ProgressAggregator<'a> {
    /// Creates the reporters required by `mode` and publishes zeroed counters.
    pub fn new(
        mode: ProgressMode,
        slots: usize,
        description: &str,
        factory: &dyn ReporterFactory,
        publish: &'a watch::Sender<ProgressCounters>,
    ) -> Self {
        let combined = match mode {
            ProgressMode::None => None,
            ProgressMode::SingleBar | ProgressMode::PerWorkerBar => {
                Some(factory.create(None, description))
            }
        };
        let workers = match mode {
            ProgressMode::PerWorkerBar => (0..slots)
                .map(|i| factory.create(Some(i), description))
                .collect(),
            _ => Vec::new(),
        };
        publish.send_replace(ProgressCounters::default());
        Self {
            counters: ProgressCounters::default(),
            combined,
            workers,
            publish,
        }
    }

    /// Records the total once it is known.
    pub fn set_total(&mut self, total: u64) {
        if self.counters.total == Some(total) {
            return;
        }
        self.counters.total = Some(total);
        if let Some(r) = self.combined.as_mut() {
            r.set_total(total);
        }
        self.publish();
    }

    /// A unit was pulled from the source.
    pub fn on_submitted(&mut self) {
        self.counters.submitted += 1;
        self.publish();
    }

    /// A unit started on `slot`.
    pub fn on_started(&mut self, slot: usize, label: &str) {
        self.counters.running += 1;
        if let Some(r) = self.workers.get_mut(slot) {
            r.reset();
            r.set_total(1);
            r.set_message(label);
        }
        self.publish();
    }

    /// The unit running on `slot` returned (whatever the outcome).
    pub fn on_finished(&mut self, slot: usize) {
        self.counters.running = self.counters.running.saturating_sub(1);
        if let Some(r) = self.workers.get_mut(slot) {
            r.advance(1);
        }
        self.publish();
    }

    /// A unit reached a terminal state.
    pub fn on_terminal(&mut self, state: TaskState) {
        let c = &mut self.counters;
        match state {
            TaskState::Succeeded => c.succeeded += 1,
            TaskState::Failed => c.failed += 1,
            TaskState::Skipped => c.skipped += 1,
            TaskState::Cancelled => c.cancelled += 1,
            TaskState::Pending | TaskState::Running => return,
        }
        c.completed += 1;
        if let Some(r) = self.combined.as_mut() {
            r.advance(1);
        }
        self.publish();
    }

    /// Closes every reporter. Called once, after the run drained.
    pub fn close(&mut self) {
        if self.counters.total.is_none() {
            self.set_total(self.counters.submitted);
        }
        for r in self.workers.iter_mut() {
            r.close();
        }
        if let Some(r) = self.combined.as_mut() {
            r.close();
        }
    }

    fn publish(&self) {
        self.publish.send_replace(self.counters);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recording {
        tag: String,
        log: Log,
    }

    impl Reporter for Recording {
        fn advance(&mut self, n: u64) {
            self.log.lock().unwrap().push(format!("{} advance {n}", self.tag));
        }
        fn set_total(&mut self, total: u64) {
            self.log.lock().unwrap().push(format!("{} total {total}", self.tag));
        }
        fn reset(&mut self) {
            self.log.lock().unwrap().push(format!("{} reset", self.tag));
        }
        fn close(&mut self) {
            self.log.lock().unwrap().push(format!("{} close", self.tag));
        }
    }

    struct Factory(Log);

    impl ReporterFactory for Factory {
        fn create(&self, slot: Option<usize>, _description: &str) -> Box<dyn Reporter> {
            let tag = slot.map_or_else(|| "all".to_string(), |i| format!("w{i}"));
            Box::new(Recording {
                tag,
                log: Arc::clone(&self.0),
            })
        }
    }

    #[test]
    fn single_bar_advances_on_terminal_only() {
        let log = Log::default();
        let (tx, rx) = watch::channel(ProgressCounters::default());
        let mut agg = ProgressAggregator::new(ProgressMode::SingleBar, 2, "", &Factory(log.clone()), &tx);

        agg.set_total(2);
        agg.on_submitted();
        agg.on_started(0, "a");
        agg.on_finished(0);
        agg.on_terminal(TaskState::Succeeded);
        agg.on_terminal(TaskState::Cancelled);
        agg.close();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["all total 2", "all advance 1", "all advance 1", "all close"]
        );
        let seen = *rx.borrow();
        assert_eq!(seen.completed, 2);
        assert_eq!(seen.succeeded, 1);
        assert_eq!(seen.cancelled, 1);
        assert_eq!(seen.running, 0);
    }

    #[test]
    fn per_worker_bars_reset_on_slot_reuse() {
        let log = Log::default();
        let (tx, _rx) = watch::channel(ProgressCounters::default());
        let mut agg =
            ProgressAggregator::new(ProgressMode::PerWorkerBar, 1, "", &Factory(log.clone()), &tx);

        agg.on_started(0, "first");
        agg.on_finished(0);
        agg.on_started(0, "second");
        agg.on_finished(0);

        let w0: Vec<_> = log
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.starts_with("w0"))
            .cloned()
            .collect();
        assert_eq!(
            w0,
            vec![
                "w0 reset", "w0 total 1", "w0 advance 1", "w0 reset", "w0 total 1", "w0 advance 1"
            ]
        );
    }

    #[test]
    fn close_fills_unknown_total() {
        let (tx, rx) = watch::channel(ProgressCounters::default());
        let mut agg = ProgressAggregator::new(ProgressMode::None, 1, "", &crate::progress::NoopFactory, &tx);
        agg.on_submitted();
        agg.on_submitted();
        agg.close();
        assert_eq!(rx.borrow().total, Some(2));
    }
}
