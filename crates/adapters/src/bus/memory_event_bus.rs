use std::sync::{Arc, RwLock};

use domain::common::error::DomainError;
use domain::ratelimit::event::RateLimitEvent;
use ports::secondary::event_sink::EventSink;
use ports::secondary::metrics_port::MetricsPort;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Subscriber channel capacity matching the reference deployment.
pub const DEFAULT_BUS_CAPACITY: usize = 100;

struct Subscriber {
    event_type: String,
    tx: mpsc::Sender<RateLimitEvent>,
}

/// Bounded fan-out bus for persisted events.
///
/// Subscribers register a filter (`"*"` for everything, or one event type)
/// and receive a bounded channel. A full channel drops the event for that
/// subscriber rather than blocking the publisher; the projection is
/// therefore best-effort and consumers needing exactness rebuild from the
/// event store.
pub struct InMemoryEventBus {
    capacity: usize,
    subscribers: RwLock<Vec<Subscriber>>,
    metrics: Arc<dyn MetricsPort>,
}

impl InMemoryEventBus {
    pub fn new(capacity: usize, metrics: Arc<dyn MetricsPort>) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: RwLock::new(Vec::new()),
            metrics,
        }
    }

    /// Register a subscriber for one event type, or `"*"` for all.
    pub fn subscribe(&self, event_type: &str) -> mpsc::Receiver<RateLimitEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.push(Subscriber {
                event_type: event_type.to_string(),
                tx,
            });
        }
        rx
    }
}

impl EventSink for InMemoryEventBus {
    fn publish(&self, event: &RateLimitEvent) -> Result<(), DomainError> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|_| DomainError::Internal("event bus lock poisoned".to_string()))?;

        for subscriber in subscribers
            .iter()
            .filter(|s| s.event_type == "*" || s.event_type == event.event_type())
        {
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => self.metrics.record_event_published(),
                Err(TrySendError::Full(_)) => {
                    self.metrics.record_event_dropped("subscriber_full");
                    tracing::warn!(
                        event_id = %event.meta().id,
                        event_type = event.event_type(),
                        "subscriber channel full, event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    self.metrics.record_event_dropped("subscriber_closed");
                }
            }
        }
        Ok(())
    }
}
