//! # Logging subscriber.
//!
//! [`LogWriter`] renders runtime events as `tracing` records under the
//! `batchvisor::events` target:
//!
//! ```text
//! DEBUG task=task-3 name=resize-003 attempt=1 slot=0 starting
//!  WARN task=task-3 name=resize-003 attempt=1 reason="decoder error" attempt failed
//!  INFO task=task-3 name=resize-003 attempt=1 delay=250ms retry scheduled
//!  INFO reason="task-3 failed" cancel requested
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "batchvisor::events";

/// Subscriber writing every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.map(|t| t.to_string()).unwrap_or_default();
        let name = e.name.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        let attempt = e.attempt.unwrap_or(0);

        match e.kind {
            EventKind::RunStarted => {
                info!(target: TARGET, seq = e.seq, workers = e.slot, policy = reason, "run started");
            }
            EventKind::CancelRequested => {
                info!(target: TARGET, seq = e.seq, %task, reason, "cancel requested");
            }
            EventKind::RunDrained => {
                info!(target: TARGET, seq = e.seq, summary = reason, "run drained");
            }
            EventKind::TaskSubmitted => {
                debug!(target: TARGET, seq = e.seq, %task, name, "submitted");
            }
            EventKind::TaskStarting => {
                debug!(target: TARGET, seq = e.seq, %task, name, attempt, slot = e.slot, "starting");
            }
            EventKind::TaskSucceeded => {
                debug!(target: TARGET, seq = e.seq, %task, name, attempt, "succeeded");
            }
            EventKind::TaskFailed => {
                warn!(target: TARGET, seq = e.seq, %task, name, attempt, reason, "attempt failed");
            }
            EventKind::TaskFailedFinal => {
                warn!(target: TARGET, seq = e.seq, %task, name, attempt, reason, "failed");
            }
            EventKind::RetryScheduled => {
                info!(target: TARGET, seq = e.seq, %task, name, attempt, delay = ?e.delay, "retry scheduled");
            }
            EventKind::TaskSkipped => {
                info!(target: TARGET, seq = e.seq, %task, name, attempt, reason, "skipped");
            }
            EventKind::TaskCancelled => {
                debug!(target: TARGET, seq = e.seq, %task, name, "cancelled before start");
            }
            EventKind::AdapterRejected => {
                warn!(target: TARGET, seq = e.seq, %task, name, attempt, reason, "pool refused submission");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                warn!(target: TARGET, seq = e.seq, subscriber = name, reason, "subscriber issue");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
