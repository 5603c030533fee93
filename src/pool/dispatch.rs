//! # Shared job plumbing for the built-in pools.
//!
//! Every accepted submission becomes one tokio task:
//!
//! ```text
//! submit ─► spawn ─► acquire slot ─► try_start? ─► Started
//!                        │              │            │
//!                        └── lost ──────┘      exec(ctx, guard)
//!                  (token cancelled)                 │
//!                           ▼                        ▼
//!              Finished { NotStarted }   Finished { outcome } ─► release slot
//! ```
//!
//! `exec` hands the slot guard back with the outcome; the slot is released only
//! after `Finished` is sent, so a reused slot index never reports `Started`
//! ahead of the previous unit's `Finished`. A backend that cannot return the
//! guard yet (a blocking thread past its timeout) returns `None` and releases
//! the slot itself later.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::TaskId;
use crate::error::AdapterError;
use crate::pool::adapter::{Outcome, PoolEvent};
use crate::pool::handle::TaskHandle;
use crate::pool::slots::{SlotGuard, Slots};

/// What `exec` returns: the outcome, and the slot guard if the attempt is over.
pub(crate) type Ran<T> = (Outcome<T>, Option<SlotGuard>);

pub(crate) struct Dispatcher<T> {
    workers: usize,
    slots: Arc<Slots>,
    tx: mpsc::UnboundedSender<PoolEvent<T>>,
    rx: mpsc::UnboundedReceiver<PoolEvent<T>>,
    root: CancellationToken,
    outstanding: Arc<AtomicUsize>,
    queue_limit: Option<usize>,
    closed: bool,
}

impl<T: Send + 'static> Dispatcher<T> {
    pub(crate) fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            workers,
            slots: Slots::new(workers),
            tx,
            rx,
            root: CancellationToken::new(),
            outstanding: Arc::new(AtomicUsize::new(0)),
            queue_limit: None,
            closed: false,
        }
    }

    pub(crate) fn set_queue_limit(&mut self, limit: usize) {
        self.queue_limit = Some(limit.max(1));
    }

    pub(crate) fn workers(&self) -> usize {
        self.workers
    }

    /// Spawns the job for one submission.
    pub(crate) fn dispatch<E, Fut>(
        &mut self,
        id: TaskId,
        exec: E,
    ) -> Result<TaskHandle, AdapterError>
    where
        E: FnOnce(CancellationToken, SlotGuard) -> Fut + Send + 'static,
        Fut: Future<Output = Ran<T>> + Send + 'static,
    {
        if self.closed {
            return Err(AdapterError::Closed);
        }
        let queued = self.outstanding.load(Ordering::Acquire);
        if self.queue_limit.is_some_and(|limit| queued >= limit) {
            return Err(AdapterError::Saturated { queued });
        }

        let handle = TaskHandle::new(id, self.root.child_token());
        self.outstanding.fetch_add(1, Ordering::AcqRel);

        let job = handle.clone();
        let slots = Arc::clone(&self.slots);
        let tx = self.tx.clone();
        let outstanding = Arc::clone(&self.outstanding);

        tokio::spawn(async move {
            let (slot, (outcome, guard)) = drive(&job, &slots, &tx, exec).await;
            let _ = tx.send(PoolEvent::Finished { id, slot, outcome });
            drop(guard);
            // decremented after the send so `next_event` never misses a final event
            outstanding.fetch_sub(1, Ordering::AcqRel);
        });

        Ok(handle)
    }

    pub(crate) async fn next_event(&mut self) -> Option<PoolEvent<T>> {
        if self.outstanding.load(Ordering::Acquire) == 0 {
            return self.rx.try_recv().ok();
        }
        self.rx.recv().await
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.root.cancel();
        self.slots.close();
    }
}

impl<T> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        self.root.cancel();
        self.slots.close();
    }
}

async fn drive<T, E, Fut>(
    job: &TaskHandle,
    slots: &Arc<Slots>,
    tx: &mpsc::UnboundedSender<PoolEvent<T>>,
    exec: E,
) -> (Option<usize>, Ran<T>)
where
    E: FnOnce(CancellationToken, SlotGuard) -> Fut,
    Fut: Future<Output = Ran<T>>,
{
    let token = job.token();
    let guard = tokio::select! {
        biased;
        _ = token.cancelled() => None,
        g = slots.acquire() => g,
    };
    let Some(guard) = guard else {
        return (None, (Outcome::NotStarted, None));
    };
    if !job.try_start() {
        return (None, (Outcome::NotStarted, Some(guard)));
    }

    let slot = guard.index();
    let _ = tx.send(PoolEvent::Started { id: job.id(), slot });
    (Some(slot), exec(token.child_token(), guard).await)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time;

    use super::*;

    async fn ok_after(ms: u64, slot: SlotGuard) -> Ran<u64> {
        time::sleep(Duration::from_millis(ms)).await;
        (Outcome::Success(ms), Some(slot))
    }

    #[tokio::test(start_paused = true)]
    async fn started_precedes_finished() {
        let mut d = Dispatcher::<u64>::new(1);
        d.dispatch(TaskId::new(1), |_ctx, g| ok_after(5, g))
            .expect("accepted");

        match d.next_event().await {
            Some(PoolEvent::Started { id, slot }) => {
                assert_eq!(id, TaskId::new(1));
                assert_eq!(slot, 0);
            }
            other => panic!("expected Started, got {other:?}"),
        }
        match d.next_event().await {
            Some(PoolEvent::Finished { slot, outcome, .. }) => {
                assert_eq!(slot, Some(0));
                assert!(matches!(outcome, Outcome::Success(5)));
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        assert!(d.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_queued_never_starts() {
        let mut d = Dispatcher::<u64>::new(1);
        d.dispatch(TaskId::new(1), |_ctx, g| ok_after(50, g))
            .expect("first");
        let second = d
            .dispatch(TaskId::new(2), |_ctx, g| ok_after(1, g))
            .expect("second");
        assert!(second.cancel_if_not_started());

        let mut seen = Vec::new();
        while let Some(ev) = d.next_event().await {
            seen.push(ev);
        }
        let not_started = seen.iter().any(|ev| {
            matches!(
                ev,
                PoolEvent::Finished { id, slot: None, outcome: Outcome::NotStarted }
                    if *id == TaskId::new(2)
            )
        });
        assert!(not_started);
        assert!(!seen.iter().any(
            |ev| matches!(ev, PoolEvent::Started { id, .. } if *id == TaskId::new(2))
        ));
    }

    #[tokio::test]
    async fn closed_dispatcher_refuses() {
        let mut d = Dispatcher::<u64>::new(2);
        d.close();
        let err = d
            .dispatch(TaskId::new(1), |_ctx, g| ok_after(0, g))
            .unwrap_err();
        assert_eq!(err, AdapterError::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_limit_saturates() {
        let mut d = Dispatcher::<u64>::new(1);
        d.set_queue_limit(1);
        d.dispatch(TaskId::new(1), |_ctx, g| ok_after(10, g))
            .expect("first");
        let err = d
            .dispatch(TaskId::new(2), |_ctx, g| ok_after(10, g))
            .unwrap_err();
        assert_eq!(err, AdapterError::Saturated { queued: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn slot_is_released_after_finished_is_sent() {
        let mut d = Dispatcher::<u64>::new(1);
        for id in 1..=3 {
            d.dispatch(TaskId::new(id), move |_ctx, g| async move {
                (Outcome::Success(id), Some(g))
            })
            .expect("accepted");
        }

        let mut order = Vec::new();
        while let Some(ev) = d.next_event().await {
            order.push(match ev {
                PoolEvent::Started { id, .. } => format!("start {}", id.get()),
                PoolEvent::Finished { id, .. } => format!("finish {}", id.get()),
            });
        }
        let mut running = 0i32;
        for step in &order {
            running += if step.starts_with("start") { 1 } else { -1 };
            assert!((0..=1).contains(&running), "{order:?}");
        }
        assert_eq!(order.len(), 6);
    }
}
