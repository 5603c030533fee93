//! Progress counters, aggregation and pluggable reporters.

mod aggregator;
#[cfg(feature = "indicatif")]
mod bar;
mod counters;
mod reporter;

pub(crate) use aggregator::ProgressAggregator;
#[cfg(feature = "indicatif")]
pub use bar::{BarFactory, BarReporter};
pub use counters::ProgressCounters;
pub use reporter::{NoopFactory, NoopReporter, ProgressMode, Reporter, ReporterFactory};
