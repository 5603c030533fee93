//! # Work abstractions.
//!
//! A work item is one caller-supplied unit of work. The orchestrator never looks
//! inside it: it only needs a label for logs ([`Describe::name`]), whether it is
//! safe to run again ([`Describe::reentrant`]), and a way to execute it.
//!
//! Two execution flavours exist, one per pool backend:
//! - [`Work`] async, for [`AsyncPool`](crate::AsyncPool);
//! - [`BlockingWork`] synchronous, for [`ThreadPool`](crate::ThreadPool).
//!
//! Both receive a [`CancellationToken`] that fires when the attempt times out or
//! the pool shuts down. Cancelling a run does **not** fire it: work that already
//! started is allowed to finish.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Metadata every work item exposes to the orchestrator.
pub trait Describe {
    /// Human-readable label used in events and logs.
    fn name(&self) -> &str;

    /// Whether the item may be executed more than once.
    ///
    /// Retry policies trust this flag; it is never verified. Items returning
    /// `false` end as failed instead of being retried.
    fn reentrant(&self) -> bool {
        true
    }
}

/// # Asynchronous work item.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use batchvisor::{Describe, TaskError, Work};
///
/// struct Fetch { url: String }
///
/// impl Describe for Fetch {
///     fn name(&self) -> &str { &self.url }
/// }
///
/// #[async_trait]
/// impl Work for Fetch {
///     type Output = usize;
///
///     async fn run(&self, ctx: CancellationToken) -> Result<usize, TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         Ok(self.url.len())
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Describe + Send + Sync + 'static {
    /// Value produced by a successful attempt.
    type Output: Send + 'static;

    /// Executes one attempt.
    async fn run(&self, ctx: CancellationToken) -> Result<Self::Output, TaskError>;
}

/// # Blocking work item, executed on a dedicated thread.
///
/// Implementations may poll `ctx.is_cancelled()` between steps to stop early
/// after a timeout; the thread itself is never interrupted.
pub trait BlockingWork: Describe + Send + Sync + 'static {
    /// Value produced by a successful attempt.
    type Output: Send + 'static;

    /// Executes one attempt on the calling thread.
    fn run(&self, ctx: CancellationToken) -> Result<Self::Output, TaskError>;
}
