//! # Per-subscriber delivery lanes.
//!
//! Every subscriber gets its own lane: a bounded `mpsc` queue drained by a
//! dedicated tokio task. [`SubscriberSet::emit`] never waits.
//!
//! ```text
//!            ┌─► lane "log-writer" ─► on_event ─┐
//! emit(ev) ──┼─► lane "audit"      ─► on_event ─┼─► panic ─► SubscriberPanicked on the bus
//!            └─► lane ...                        │
//!   full/closed lane ─► SubscriberOverflow on the bus (never for an overflow itself)
//! ```
//!
//! Order is FIFO within a lane; lanes are independent of each other. A
//! subscriber that panics stays registered and keeps receiving events.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::events::{Bus, Event, EventKind};
use crate::pool::panic_message;
use crate::subscribers::Subscribe;

struct Lane {
    subscriber: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
    drain: JoinHandle<()>,
}

impl Lane {
    fn open(sub: Arc<dyn Subscribe>, diagnostics: Bus) -> Self {
        let subscriber = sub.name();
        let (queue, mut inbox) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
        let drain = tokio::spawn(async move {
            while let Some(ev) = inbox.recv().await {
                let delivered = std::panic::AssertUnwindSafe(sub.on_event(&ev))
                    .catch_unwind()
                    .await;
                if let Err(payload) = delivered {
                    let msg = panic_message(payload.as_ref());
                    warn!(subscriber, panic = %msg, "subscriber panicked");
                    diagnostics.publish(Event::about_subscriber(
                        EventKind::SubscriberPanicked,
                        subscriber,
                        msg,
                    ));
                }
            }
        });
        Self {
            subscriber,
            queue,
            drain,
        }
    }
}

/// Fans events out to a fixed set of subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    diagnostics: Bus,
}

impl SubscriberSet {
    /// Opens one lane per subscriber. Diagnostics are published on `bus`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let lanes = subs
            .into_iter()
            .map(|sub| Lane::open(sub, bus.clone()))
            .collect();
        Self {
            lanes,
            diagnostics: bus,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Queues `event` on every lane without waiting.
    pub fn emit(&self, event: Event) {
        let event = Arc::new(event);
        for lane in &self.lanes {
            let why = match lane.queue.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(TrySendError::Full(_)) => "full",
                Err(TrySendError::Closed(_)) => "closed",
            };
            if event.kind == EventKind::SubscriberOverflow {
                continue;
            }
            warn!(subscriber = lane.subscriber, why, "subscriber dropped event");
            self.diagnostics.publish(Event::about_subscriber(
                EventKind::SubscriberOverflow,
                lane.subscriber,
                why,
            ));
        }
    }

    /// Closes the lanes and waits until each has delivered what it holds.
    pub async fn shutdown(self) {
        for Lane { queue, drain, .. } in self.lanes {
            drop(queue);
            if let Err(e) = drain.await {
                warn!(error = %e, "subscriber lane aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Arc<Collect> {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Explodes;

    #[async_trait]
    impl Subscribe for Explodes {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber bug");
        }
        fn name(&self) -> &'static str {
            "explodes"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_survives_panicking_peer() {
        let bus = Bus::new(16);
        let mut diag = bus.subscribe();
        let seen = Arc::new(Collect::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Arc::clone(&seen)), Arc::new(Explodes)];
        let set = SubscriberSet::new(subs, bus);

        set.emit(Event::new(EventKind::TaskSubmitted));
        set.emit(Event::new(EventKind::TaskStarting));
        set.shutdown().await;

        assert_eq!(
            *seen.0.lock().unwrap(),
            vec![EventKind::TaskSubmitted, EventKind::TaskStarting]
        );
        let first = diag.recv().await.expect("panic diagnostic");
        assert_eq!(first.kind, EventKind::SubscriberPanicked);
        assert_eq!(first.name.as_deref(), Some("explodes"));
    }
}
