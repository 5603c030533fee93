//! # Example: CPU-bound batch on blocking threads
//!
//! Hashes synthetic "files" on a [`ThreadPool`]. One input is corrupt and the
//! run is configured to cancel on the first failure, so units that have not
//! started yet end up `Cancelled`.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example blocking
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use batchvisor::{
    BlockingFn, Describe, FailurePolicy, Orchestrator, RunConfig, TaskError, ThreadPool,
};

fn checksum(seed: u64, rounds: u32) -> u64 {
    let mut h = seed ^ 0xcbf2_9ce4_8422_2325;
    for _ in 0..rounds {
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    }
    h
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let workers = 3;
    let cfg = RunConfig {
        prefetch: 2,
        timeout: Duration::from_secs(5),
        ..RunConfig::default()
            .with_concurrency(workers)
            .with_policy(FailurePolicy::CancelOnFailure)
    };
    let orch = Orchestrator::new(cfg);

    let tasks: Vec<_> = (0..16u64)
        .map(|seed| {
            BlockingFn::arc(format!("blob-{seed}"), move |ctx: CancellationToken| {
                if seed == 6 {
                    return Err(TaskError::fatal("truncated header"));
                }
                let mut acc = 0u64;
                for chunk in 0..20 {
                    if ctx.is_cancelled() {
                        return Err(TaskError::Canceled);
                    }
                    acc ^= checksum(seed * 31 + chunk, 20_000);
                    std::thread::sleep(Duration::from_millis(5));
                }
                Ok(acc)
            })
        })
        .collect();

    let report = orch.run(ThreadPool::new(workers), tasks).await?;

    info!(summary = %report.summary(), reason = ?report.cancel_reason(), "run finished");
    for unit in report.units() {
        match unit.result() {
            Some(sum) => println!("{:<8} {sum:016x}", unit.work().name()),
            None => println!("{:<8} {}", unit.work().name(), unit.state()),
        }
    }
    Ok(())
}
