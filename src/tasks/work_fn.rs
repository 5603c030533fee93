//! # Closure-backed work items.
//!
//! [`WorkFn`] wraps `Fn(CancellationToken) -> Future`, [`BlockingFn`] wraps
//! `Fn(CancellationToken) -> Result<T, TaskError>`. Each attempt calls the closure
//! again, so no state leaks between retries unless the closure captures it
//! explicitly (for example behind an `Arc`).
//!
//! Items built from the same closure expression share one type, which is what
//! a homogeneous batch looks like:
//!
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use batchvisor::{Describe, TaskError, WorkFn};
//!
//! let items: Vec<_> = (0..3u64)
//!     .map(|n| {
//!         WorkFn::arc(format!("square-{n}"), move |_ctx: CancellationToken| async move {
//!             Ok::<_, TaskError>(n * n)
//!         })
//!     })
//!     .collect();
//! assert_eq!(items[2].name(), "square-2");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::work::{BlockingWork, Describe, Work};

/// Async closure work item.
#[derive(Debug)]
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    reentrant: bool,
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates a re-entrant work item.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            reentrant: true,
            f,
        }
    }

    /// Creates the work item and wraps it in an `Arc`, ready for submission.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Marks whether the closure may run more than once.
    pub fn reentrant(mut self, reentrant: bool) -> Self {
        self.reentrant = reentrant;
        self
    }
}

impl<F> Describe for WorkFn<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn reentrant(&self) -> bool {
        self.reentrant
    }
}

#[async_trait]
impl<F, Fut, T> Work for WorkFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn run(&self, ctx: CancellationToken) -> Result<T, TaskError> {
        (self.f)(ctx).await
    }
}

/// Blocking closure work item.
#[derive(Debug)]
pub struct BlockingFn<F> {
    name: Cow<'static, str>,
    reentrant: bool,
    f: F,
}

impl<F> BlockingFn<F> {
    /// Creates a re-entrant blocking work item.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            reentrant: true,
            f,
        }
    }

    /// Creates the work item and wraps it in an `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Marks whether the closure may run more than once.
    pub fn reentrant(mut self, reentrant: bool) -> Self {
        self.reentrant = reentrant;
        self
    }
}

impl<F> Describe for BlockingFn<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn reentrant(&self) -> bool {
        self.reentrant
    }
}

impl<F, T> BlockingWork for BlockingFn<F>
where
    F: Fn(CancellationToken) -> Result<T, TaskError> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn run(&self, ctx: CancellationToken) -> Result<T, TaskError> {
        (self.f)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn work_fn_produces_fresh_future_per_attempt() {
        let w = WorkFn::new("double", |_ctx: CancellationToken| async { Ok::<_, TaskError>(21 * 2) });
        assert_eq!(w.run(CancellationToken::new()).await, Ok(42));
        assert_eq!(w.run(CancellationToken::new()).await, Ok(42));
        assert!(Describe::reentrant(&w));
    }

    #[test]
    fn blocking_fn_sees_cancellation() {
        let w = BlockingFn::new("guarded", |ctx: CancellationToken| {
            if ctx.is_cancelled() {
                Err(TaskError::Canceled)
            } else {
                Ok(())
            }
        })
        .reentrant(false);

        let ctx = CancellationToken::new();
        assert_eq!(w.run(ctx.clone()), Ok(()));
        ctx.cancel();
        assert_eq!(w.run(ctx), Err(TaskError::Canceled));
        assert_eq!(w.name(), "guarded");
        assert!(!Describe::reentrant(&w));
    }
}
