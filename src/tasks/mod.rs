//! # Work item abstractions.
//!
//! - [`Describe`] label and re-entrancy flag
//! - [`Work`] / [`WorkFn`] async work and its closure adapter
//! - [`BlockingWork`] / [`BlockingFn`] blocking work and its closure adapter

mod work;
mod work_fn;

pub use work::{BlockingWork, Describe, Work};
pub use work_fn::{BlockingFn, WorkFn};
