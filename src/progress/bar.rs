//! Terminal progress bars backed by `indicatif`.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::progress::reporter::{Reporter, ReporterFactory};

const COMBINED_TEMPLATE: &str = "{prefix:>12.bold} [{bar:40.cyan/blue}] {pos}/{len} {elapsed_precise} {wide_msg}";
const WORKER_TEMPLATE: &str = "{prefix:>12.dim} {spinner:.green} {wide_msg:.dim}";

/// Factory placing every bar of a run into one [`MultiProgress`].
#[derive(Clone, Default)]
pub struct BarFactory {
    multi: MultiProgress,
}

impl BarFactory {
    /// Uses the default stderr draw target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws into an existing multi-progress (for example one shared with other output).
    pub fn with_multi(multi: MultiProgress) -> Self {
        Self { multi }
    }

    fn style(template: &str) -> ProgressStyle {
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl ReporterFactory for BarFactory {
    fn create(&self, slot: Option<usize>, description: &str) -> Box<dyn Reporter> {
        let bar = match slot {
            None => {
                let bar = self.multi.add(ProgressBar::no_length());
                bar.set_style(Self::style(COMBINED_TEMPLATE));
                bar.set_prefix(if description.is_empty() {
                    "tasks".to_string()
                } else {
                    description.to_string()
                });
                bar
            }
            Some(i) => {
                let bar = self.multi.add(ProgressBar::new(1));
                bar.set_style(Self::style(WORKER_TEMPLATE));
                bar.set_prefix(format!("worker {i}"));
                bar
            }
        };
        Box::new(BarReporter { bar })
    }
}

/// One `indicatif` bar.
pub struct BarReporter {
    bar: ProgressBar,
}

impl Reporter for BarReporter {
    fn advance(&mut self, n: u64) {
        self.bar.inc(n);
    }

    fn set_total(&mut self, total: u64) {
        self.bar.set_length(total);
    }

    fn reset(&mut self) {
        self.bar.reset();
    }

    fn set_message(&mut self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    fn close(&mut self) {
        self.bar.finish();
    }
}
