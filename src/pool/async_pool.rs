//! Pool backend running [`Work`] items as tokio tasks.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::pool::adapter::{PoolEvent, Submission, WorkerPool};
use crate::pool::dispatch::Dispatcher;
use crate::pool::handle::TaskHandle;
use crate::pool::runner::run_async;
use crate::tasks::Work;

/// # Async worker pool.
///
/// Runs at most `workers` attempts at once on the current tokio runtime.
/// Each running attempt occupies one numbered slot in `0..workers`.
///
/// `W` may be a concrete type or a trait object such as
/// `dyn Work<Output = T>` for heterogeneous batches.
///
/// # Example
/// ```
/// use batchvisor::{AsyncPool, WorkFn, WorkerPool};
/// # use batchvisor::TaskError;
/// # use tokio_util::sync::CancellationToken;
/// # type Job = WorkFn<fn(CancellationToken) -> std::future::Ready<Result<u8, TaskError>>>;
///
/// let pool = AsyncPool::<Job>::new(4).with_queue_limit(64);
/// assert_eq!(pool.workers(), 4);
/// ```
pub struct AsyncPool<W: ?Sized + Work> {
    dispatch: Dispatcher<W::Output>,
}

impl<W: ?Sized + Work> AsyncPool<W> {
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
impl<W: ?Sized + Work> WorkerPool for AsyncPool<W> {
    type Work = W;
    type Output = W::Output;

    fn workers(&self) -> usize {
        self.dispatch.workers()
    }

    fn submit(&mut self, sub: Submission<W>) -> Result<TaskHandle, AdapterError> {
        let Submission {
            id, work, timeout, ..
        } = sub;
        self.dispatch.dispatch(id, move |ctx, slot| async move {
            let outcome = run_async(work.run(ctx.clone()), &ctx, timeout).await;
            (outcome, Some(slot))
        })
    }

    async fn next_event(&mut self) -> Option<PoolEvent<W::Output>> {
        self.dispatch.next_event().await
    }

    fn shutdown(&mut self) {
        self.dispatch.close();
    }
}
