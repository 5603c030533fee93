mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use batchvisor::{
    BlockingFn, CancelReason, FailurePolicy, Orchestrator, ProgressMode, RunConfig, TaskError,
    TaskState, ThreadPool,
};
use common::RecordingFactory;

fn cfg(concurrency: usize, policy: FailurePolicy) -> RunConfig {
    RunConfig::default()
        .with_concurrency(concurrency)
        .with_policy(policy)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn thread_pool_runs_blocking_work_within_bound() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..12u32)
        .map(|i| {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            BlockingFn::arc(format!("chunk-{i}"), move |_ctx: CancellationToken| {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(10));
                current.fetch_sub(1, Ordering::SeqCst);
                if i == 5 {
                    Err(TaskError::fail("checksum mismatch"))
                } else {
                    Ok(i * i)
                }
            })
        })
        .collect();

    let orch = Orchestrator::new(cfg(3, FailurePolicy::SkipOnFailure));
    let report = orch.run(ThreadPool::new(3), tasks).await.expect("run");

    assert_eq!(report.len(), 12);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    let summary = report.summary();
    assert_eq!(summary.succeeded, 11);
    assert_eq!(summary.skipped, 1);

    let mut squares = report.into_results();
    squares.sort_unstable();
    assert_eq!(squares.len(), 11);
    assert_eq!(squares.last(), Some(&121));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_failure_cancels_queued_work() {
    let ran = Arc::new(AtomicUsize::new(0));
    let tasks: Vec<_> = (1..=8u32)
        .map(|i| {
            let ran = Arc::clone(&ran);
            BlockingFn::arc(format!("step-{i}"), move |_ctx: CancellationToken| {
                ran.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    Err(TaskError::fatal("disk full"))
                } else {
                    std::thread::sleep(Duration::from_millis(5));
                    Ok(i)
                }
            })
        })
        .collect();

    let orch = Orchestrator::new(cfg(1, FailurePolicy::CancelOnFailure));
    let report = orch.run(ThreadPool::new(1), tasks).await.expect("run");

    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(report.cancel_reason(), Some(CancelReason::TaskFailure(report.units()[0].id())));
    assert_eq!(report.units()[0].state(), TaskState::Failed);
    assert_eq!(report.summary().cancelled, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_timeout_signals_the_token() {
    let observed = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&observed);
    let stuck = BlockingFn::arc("stuck", move |ctx: CancellationToken| {
        while !ctx.is_cancelled() {
            std::thread::sleep(Duration::from_millis(2));
        }
        seen.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>(TaskError::Canceled)
    });
    let config = RunConfig {
        timeout: Duration::from_millis(30),
        ..cfg(1, FailurePolicy::SkipOnFailure)
    };
    let orch = Orchestrator::new(config);

    let report = orch.run(ThreadPool::new(1), vec![stuck]).await.expect("run");

    let unit = &report.units()[0];
    assert_eq!(unit.state(), TaskState::Skipped);
    assert!(matches!(unit.error(), Some(TaskError::Timeout { .. })));

    // the worker thread notices the cancelled token shortly after the timeout
    for _ in 0..100 {
        if observed.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(observed.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_slot_is_reused_only_after_finished() {
    let (factory, log) = RecordingFactory::new();
    let tasks: Vec<_> = (0..20u32)
        .map(|i| {
            BlockingFn::arc(format!("page-{i}"), move |_ctx: CancellationToken| {
                std::thread::sleep(Duration::from_millis(1));
                Ok(i)
            })
        })
        .collect();
    let config = RunConfig {
        prefetch: 1,
        ..cfg(1, FailurePolicy::SkipOnFailure).with_progress(ProgressMode::PerWorkerBar)
    };
    let orch = Orchestrator::builder(config).with_reporters(factory).build();

    let report = orch.run(ThreadPool::new(1), tasks).await.expect("run");
    assert_eq!(report.summary().succeeded, 20);

    let log = log.lock().unwrap().clone();
    let mut open = 0i32;
    let mut resets = 0;
    for (_, call) in log.iter().filter(|(slot, _)| *slot == Some(0)) {
        match call.as_str() {
            "reset" => {
                open += 1;
                resets += 1;
            }
            "advance 1" => open -= 1,
            _ => {}
        }
        assert!((0..=1).contains(&open), "{open} units open on slot 0");
    }
    assert_eq!(resets, 20);
    assert_eq!(open, 0);
}
