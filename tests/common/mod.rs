#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use batchvisor::{Describe, Reporter, ReporterFactory, TaskError, Work};

/// Tracks how many work items run at the same time.
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
    total: AtomicUsize,
}

impl Gauge {
    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> GaugeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        GaugeGuard(Arc::clone(self))
    }
}

struct GaugeGuard(Arc<Gauge>);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Work item with a scripted duration and failure count.
pub struct Scripted {
    pub n: u64,
    name: String,
    delay: Duration,
    fail_times: u32,
    calls: AtomicU32,
    gauge: Option<Arc<Gauge>>,
}

impl Scripted {
    pub fn ok(n: u64) -> Self {
        Self {
            n,
            name: format!("item-{n}"),
            delay: Duration::ZERO,
            fail_times: 0,
            calls: AtomicU32::new(0),
            gauge: None,
        }
    }

    pub fn taking(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fails the first `times` attempts.
    pub fn failing(mut self, times: u32) -> Self {
        self.fail_times = times;
        self
    }

    pub fn always_failing(self) -> Self {
        self.failing(u32::MAX)
    }

    pub fn gauged(mut self, gauge: &Arc<Gauge>) -> Self {
        self.gauge = Some(Arc::clone(gauge));
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Describe for Scripted {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Work for Scripted {
    type Output = u64;

    async fn run(&self, _ctx: CancellationToken) -> Result<u64, TaskError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.gauge.as_ref().map(|p| p.enter());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if call <= self.fail_times {
            Err(TaskError::fail(format!("{} attempt {call}", self.name)))
        } else {
            Ok(self.n)
        }
    }
}

/// Builds `count` items numbered from 1; `shape` customizes each one.
pub fn batch(count: u64, shape: impl Fn(Scripted) -> Scripted) -> Vec<Arc<Scripted>> {
    (1..=count).map(|n| Arc::new(shape(Scripted::ok(n)))).collect()
}

/// Reporter calls recorded as `(slot, call)`.
pub type CallLog = Arc<Mutex<Vec<(Option<usize>, String)>>>;

pub struct RecordingFactory {
    pub log: CallLog,
}

impl RecordingFactory {
    pub fn new() -> (Arc<Self>, CallLog) {
        let log = CallLog::default();
        (Arc::new(Self { log: Arc::clone(&log) }), log)
    }
}

impl ReporterFactory for RecordingFactory {
    fn create(&self, slot: Option<usize>, description: &str) -> Box<dyn Reporter> {
        self.log
            .lock()
            .unwrap()
            .push((slot, format!("create {description}")));
        Box::new(RecordingReporter {
            slot,
            log: Arc::clone(&self.log),
        })
    }
}

struct RecordingReporter {
    slot: Option<usize>,
    log: CallLog,
}

impl RecordingReporter {
    fn push(&self, call: String) {
        self.log.lock().unwrap().push((self.slot, call));
    }
}

impl Reporter for RecordingReporter {
    fn advance(&mut self, n: u64) {
        self.push(format!("advance {n}"));
    }

    fn set_total(&mut self, total: u64) {
        self.push(format!("total {total}"));
    }

    fn reset(&mut self) {
        self.push("reset".to_string());
    }

    fn close(&mut self) {
        self.push("close".to_string());
    }
}
