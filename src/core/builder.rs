use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::core::orchestrator::Orchestrator;
use crate::progress::{NoopFactory, ReporterFactory};
use crate::subscribers::Subscribe;

/// Builder for an [`Orchestrator`] with optional reporters, subscribers and cancel token.
pub struct OrchestratorBuilder {
    cfg: RunConfig,
    reporters: Arc<dyn ReporterFactory>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    cancel: Option<CancellationToken>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: RunConfig) -> Self {
        Self {
            cfg,
            reporters: Arc::new(NoopFactory),
            subscribers: Vec::new(),
            cancel: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the factory building progress reporters for [`RunConfig::progress`].
    pub fn with_reporters(mut self, factory: Arc<dyn ReporterFactory>) -> Self {
        self.reporters = factory;
        self
    }

    /// Uses `token` as the orchestrator's cancellation token (for example a child
    /// of an application-wide shutdown token).
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Orchestrator {
        Orchestrator::new_internal(
            self.cfg,
            self.reporters,
            self.subscribers,
            self.cancel.unwrap_or_default(),
        )
    }
}
