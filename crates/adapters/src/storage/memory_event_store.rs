use std::collections::HashMap;
use std::sync::RwLock;

use domain::common::error::DomainError;
use domain::ratelimit::event::RateLimitEvent;
use ports::secondary::event_store::EventStore;

/// Append-only in-memory event store with optimistic concurrency.
///
/// The expected-version check and the append happen under one writer lock,
/// so concurrent writers to the same aggregate race on a single winner.
#[derive(Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<String, Vec<RateLimitEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn save_events(
        &self,
        aggregate_id: &str,
        events: &[RateLimitEvent],
        expected_version: u64,
    ) -> Result<(), DomainError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| DomainError::Internal("event store lock poisoned".to_string()))?;
        let stream = streams.entry(aggregate_id.to_string()).or_default();
        let actual = stream.len() as u64;
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        Ok(())
    }

    fn get_events(&self, aggregate_id: &str) -> Result<Vec<RateLimitEvent>, DomainError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| DomainError::Internal("event store lock poisoned".to_string()))?;
        Ok(streams.get(aggregate_id).cloned().unwrap_or_default())
    }
}
