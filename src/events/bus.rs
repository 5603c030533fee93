//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. The coordinator and the subscriber
//! workers publish; one forwarder task per run receives and fans events out to
//! the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ```text
//! Coordinator ──┐
//!               ├──► Bus ───► forwarder ───► SubscriberSet ───► LogWriter, custom...
//! Subscribers ──┘  (overflow / panic diagnostics)
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - The ring buffer is shared by all receivers; slow receivers observe
//!   `RecvError::Lagged(n)` and skip the `n` oldest events.
//! - Events published while nobody listens are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver observing events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
