//! Pool backend running [`BlockingWork`] items on tokio's blocking threads.
//!
//! A running attempt keeps its worker slot until its thread returns. When an
//! attempt times out, the unit is reported as failed right away, but the slot
//! stays occupied until the closure notices the cancelled token or finishes.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::pool::adapter::{PoolEvent, Submission, WorkerPool};
use crate::pool::dispatch::Dispatcher;
use crate::pool::handle::TaskHandle;
use crate::pool::runner::run_blocking;
use crate::tasks::BlockingWork;

/// Thread-backed worker pool for CPU-bound or blocking work.
pub struct ThreadPool<W: ?Sized + BlockingWork> {
    dispatch: Dispatcher<W::Output>,
}

impl<W: ?Sized + BlockingWork> ThreadPool<W> {
    /// Creates a pool with `workers` slots (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            dispatch: Dispatcher::new(workers),
        }
    }

    /// Refuses submissions with [`AdapterError::Saturated`] once `limit`
    /// accepted submissions are still outstanding.
    pub fn with_queue_limit(mut self, limit: usize) -> Self {
        self.dispatch.set_queue_limit(limit);
        self
    }
}

#[async_trait]
impl<W: ?Sized + BlockingWork> WorkerPool for ThreadPool<W> {
    type Work = W;
    type Output = W::Output;

    fn workers(&self) -> usize {
        self.dispatch.workers()
    }

    fn submit(&mut self, sub: Submission<W>) -> Result<TaskHandle, AdapterError> {
        let Submission {
            id, work, timeout, ..
        } = sub;
        self.dispatch
            .dispatch(id, move |ctx, slot| run_blocking(work, ctx, timeout, slot))
    }

    async fn next_event(&mut self) -> Option<PoolEvent<W::Output>> {
        self.dispatch.next_event().await
    }

    fn shutdown(&mut self) {
        self.dispatch.close();
    }
}
