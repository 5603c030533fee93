//! # Execute a single attempt.
//!
//! Wraps one execution of a work item with:
//! - an optional timeout (`tokio::time::timeout`), which cancels the attempt token;
//! - panic capture, reported as [`TaskError::Panicked`].
//!
//! ```text
//! async:    fut ──catch_unwind──► timeout? ──► Outcome
//! blocking: spawn_blocking(catch_unwind(run)) ──► timeout? ──► Outcome
//!                   └── slot guard moves into the thread and comes back with
//!                       the result; after a timeout the thread keeps it and
//!                       releases it when the closure returns
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::pool::adapter::Outcome;
use crate::pool::dispatch::Ran;
use crate::pool::slots::SlotGuard;
use crate::tasks::BlockingWork;

/// Runs an async attempt to completion, timeout, or panic.
pub(crate) async fn run_async<T, F>(
    fut: F,
    ctx: &CancellationToken,
    timeout: Option<Duration>,
) -> Outcome<T>
where
    F: Future<Output = Result<T, TaskError>>,
{
    let guarded = AssertUnwindSafe(fut).catch_unwind();
    let res = match timeout.filter(|d| !d.is_zero()) {
        Some(dur) => match time::timeout(dur, guarded).await {
            Ok(r) => r,
            Err(_elapsed) => {
                ctx.cancel();
                return Outcome::Failure(TaskError::Timeout { timeout: dur });
            }
        },
        None => guarded.await,
    };

    match res {
        Ok(Ok(value)) => Outcome::Success(value),
        Ok(Err(e)) => Outcome::Failure(e),
        Err(payload) => Outcome::Failure(TaskError::Panicked {
            reason: panic_message(payload.as_ref()),
        }),
    }
}

/// Runs a blocking attempt on the blocking thread pool.
pub(crate) async fn run_blocking<W>(
    work: Arc<W>,
    ctx: CancellationToken,
    timeout: Option<Duration>,
    slot: SlotGuard,
) -> Ran<W::Output>
where
    W: BlockingWork + ?Sized,
{
    let thread_ctx = ctx.clone();
    let mut join = tokio::task::spawn_blocking(move || {
        let res = std::panic::catch_unwind(AssertUnwindSafe(|| work.run(thread_ctx)));
        (res, slot)
    });

    let joined = match timeout.filter(|d| !d.is_zero()) {
        Some(dur) => match time::timeout(dur, &mut join).await {
            Ok(r) => r,
            Err(_elapsed) => {
                // the thread still holds the slot and drops it on return
                ctx.cancel();
                return (Outcome::Failure(TaskError::Timeout { timeout: dur }), None);
            }
        },
        None => join.await,
    };

    match joined {
        Ok((Ok(Ok(value)), slot)) => (Outcome::Success(value), Some(slot)),
        Ok((Ok(Err(e)), slot)) => (Outcome::Failure(e), Some(slot)),
        Ok((Err(payload), slot)) => {
            let reason = panic_message(payload.as_ref());
            (Outcome::Failure(TaskError::Panicked { reason }), Some(slot))
        }
        Err(join_err) if join_err.is_panic() => {
            let reason = panic_message(join_err.into_panic().as_ref());
            (Outcome::Failure(TaskError::Panicked { reason }), None)
        }
        Err(_) => (Outcome::Failure(TaskError::Canceled), None),
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_and_failure_pass_through() {
        let ctx = CancellationToken::new();
        let ok = run_async(async { Ok::<_, TaskError>(3) }, &ctx, None).await;
        assert!(matches!(ok, Outcome::Success(3)));

        let err = run_async(async { Err::<u8, _>(TaskError::fail("nope")) }, &ctx, None).await;
        assert!(matches!(err, Outcome::Failure(TaskError::Fail { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_attempt_token() {
        let ctx = CancellationToken::new();
        let slow = async {
            time::sleep(Duration::from_secs(10)).await;
            Ok::<_, TaskError>(())
        };
        let out = run_async(slow, &ctx, Some(Duration::from_millis(50))).await;
        assert!(matches!(
            out,
            Outcome::Failure(TaskError::Timeout { timeout }) if timeout == Duration::from_millis(50)
        ));
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn zero_timeout_means_none() {
        let ctx = CancellationToken::new();
        let out = run_async(async { Ok::<_, TaskError>(1) }, &ctx, Some(Duration::ZERO)).await;
        assert!(matches!(out, Outcome::Success(1)));
    }

    #[tokio::test]
    async fn panics_become_failures() {
        let ctx = CancellationToken::new();
        let out = run_async(
            async {
                if true {
                    panic!("kaboom");
                }
                Ok::<u8, TaskError>(0)
            },
            &ctx,
            None,
        )
        .await;
        match out {
            Outcome::Failure(TaskError::Panicked { reason }) => assert_eq!(reason, "kaboom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
