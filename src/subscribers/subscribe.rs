//! # The `Subscribe` extension point.
//!
//! Implement [`Subscribe`] to observe a run: audit trails, metrics, custom
//! dashboards. A subscriber is fed through its own bounded lane (see
//! [`SubscriberSet`](crate::SubscriberSet)), so a slow handler delays only
//! itself. When its lane is full the event is dropped for that subscriber and a
//! `SubscriberOverflow` event is published instead.
//!
//! ```rust
//! use std::sync::Mutex;
//! use async_trait::async_trait;
//! use batchvisor::{Event, EventKind, Subscribe, TaskId};
//!
//! /// Remembers which units needed a retry.
//! #[derive(Default)]
//! struct RetryAudit(Mutex<Vec<TaskId>>);
//!
//! #[async_trait]
//! impl Subscribe for RetryAudit {
//!     async fn on_event(&self, ev: &Event) {
//!         if let (EventKind::RetryScheduled, Some(id)) = (ev.kind, ev.task) {
//!             self.0.lock().unwrap().push(id);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "retry-audit"
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Receives every event of a run, in publish order.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Runs on the subscriber's lane task; avoid blocking calls.
    async fn on_event(&self, event: &Event);

    /// Name used in diagnostics. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Lane capacity.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
