//! # Event subscribers.
//!
//! ```text
//! Coordinator ── publish(Event) ──► Bus ──► forwarder ──► SubscriberSet
//!                                                              │
//!                                                ┌─────────────┼──────────┐
//!                                                ▼             ▼          ▼
//!                                            LogWriter       Custom      ...
//! ```
//!
//! - [`Subscribe`] the extension trait
//! - [`SubscriberSet`] bounded per-subscriber fan-out with panic isolation
//! - [`LogWriter`] `tracing` output (feature `logging`)

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
