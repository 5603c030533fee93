//! Failure and retry policies.
//!
//! ## Contents
//! - [`FailurePolicy`], [`decide`], [`Verdict`] what happens when a unit fails
//! - [`BackoffPolicy`] how long a retried unit waits before resubmission
//! - [`JitterPolicy`] randomization of that wait
//!
//! ## Defaults
//! - `FailurePolicy::CancelOnFailure`
//! - `BackoffPolicy::default()` → immediate retries
//! - `JitterPolicy::None`

mod backoff;
mod failure;
mod jitter;

pub use backoff::BackoffPolicy;
pub use failure::{FailureContext, FailurePolicy, Verdict, decide};
pub use jitter::JitterPolicy;
