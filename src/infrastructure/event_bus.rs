//! In-process pub/sub event bus (spec §4.2). Each subscriber gets its own
//! bounded queue; a slow subscriber drops its oldest unread event rather
//! than backpressuring the publisher, because an event stream is a
//! best-effort notification channel, not a durable log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::event::Event;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Default)]
pub struct EventBusMetrics {
    pub published: AtomicU64,
    pub dropped: AtomicU64,
}

pub struct EventBus {
    sender: broadcast::Sender<Arc<Event>>,
    pub metrics: Arc<EventBusMetrics>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: Arc::new(EventBusMetrics::default()),
        }
    }

    pub fn publish(&self, event: Event) {
        self.metrics.published.fetch_add(1, Ordering::Relaxed);
        // `send` only errors when there are no receivers; that's a normal
        // state at startup before any subscriber has attached.
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
            metrics: self.metrics.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventSubscription {
    receiver: broadcast::Receiver<Arc<Event>>,
    metrics: Arc<EventBusMetrics>,
}

impl EventSubscription {
    /// Waits for the next event. A subscriber that fell behind the ring
    /// buffer's capacity observes a `Lagged` gap, which is recorded as a
    /// drop and transparently skipped rather than surfaced as an error.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.metrics.dropped.fetch_add(skipped, Ordering::Relaxed);
                    warn!(skipped, "event subscriber lagged, dropping oldest events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{EventKind, EventPayload};

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(Event::new(EventKind::PortfolioChanged, "test", EventPayload::Empty));
        let received = sub.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::PortfolioChanged);
    }

    #[tokio::test]
    async fn lagging_subscriber_drops_oldest_without_erroring() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for _ in 0..10 {
            bus.publish(Event::new(EventKind::PriceUpdated, "test", EventPayload::Empty));
        }
        // Should still be able to receive without panicking or blocking forever.
        let received = sub.recv().await;
        assert!(received.is_some());
        assert!(bus.metrics.dropped.load(Ordering::Relaxed) > 0);
    }
}
