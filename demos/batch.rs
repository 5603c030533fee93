//! # Example: async batch with retries
//!
//! Twelve simulated downloads, four at a time. Every third one fails on its
//! first attempt and is retried with exponential backoff.
//!
//! ```bash
//! RUST_LOG=batchvisor=debug cargo run --example batch
//! cargo run --example batch --features indicatif
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use batchvisor::{
    AsyncPool, BackoffPolicy, Describe, FailurePolicy, JitterPolicy, Orchestrator, ProgressMode, RunConfig,
    Subscribe, TaskError, WorkFn,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = RunConfig {
        backoff: BackoffPolicy::exponential(Duration::from_millis(50), Duration::from_millis(400))
            .with_jitter(JitterPolicy::Equal),
        timeout: Duration::from_secs(2),
        cancel_on_signal: true,
        description: "downloading".into(),
        ..RunConfig::default()
            .with_concurrency(4)
            .with_policy(FailurePolicy::RetryUpTo(2))
            .with_progress(ProgressMode::PerWorkerBar)
    };

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(batchvisor::LogWriter)];
    let builder = Orchestrator::builder(cfg).with_subscribers(subs);
    #[cfg(feature = "indicatif")]
    let builder = builder.with_reporters(Arc::new(batchvisor::BarFactory::new()));
    let orch = builder.build();

    let tasks: Vec<_> = (1..=12u64)
        .map(|i| {
            let tries = Arc::new(AtomicU32::new(0));
            WorkFn::arc(format!("file-{i:02}"), move |ctx: CancellationToken| {
                let tries = Arc::clone(&tries);
                async move {
                    let attempt = tries.fetch_add(1, Ordering::SeqCst) + 1;
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(80 + i * 15)) => {}
                        _ = ctx.cancelled() => return Err(TaskError::Canceled),
                    }
                    if i % 3 == 0 && attempt == 1 {
                        return Err(TaskError::fail("connection reset"));
                    }
                    Ok(i * 1024)
                }
            })
        })
        .collect();

    let report = orch.run(AsyncPool::new(4), tasks).await?;

    println!("{}", report.summary());
    for unit in report.units() {
        println!(
            "  {:<8} {:<10} attempts={} bytes={:?}",
            unit.work().name(),
            unit.state(),
            unit.attempt(),
            unit.result()
        );
    }
    Ok(())
}
