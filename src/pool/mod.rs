//! Worker pool abstraction and built-in backends.
//!
//! - [`WorkerPool`] the capability the orchestrator drives;
//! - [`AsyncPool`] tokio tasks, for async [`Work`](crate::Work);
//! - [`ThreadPool`] blocking threads, for [`BlockingWork`](crate::BlockingWork).

mod adapter;
mod async_pool;
mod dispatch;
mod handle;
mod runner;
mod slots;
mod thread_pool;

pub use adapter::{Outcome, PoolEvent, Submission, WorkerPool};
pub use async_pool::AsyncPool;
pub use handle::TaskHandle;
pub(crate) use runner::panic_message;
pub use thread_pool::ThreadPool;
