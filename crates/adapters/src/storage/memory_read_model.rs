use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use domain::common::error::DomainError;
use domain::ratelimit::aggregate::aggregate_id;
use domain::ratelimit::event::RateLimitEvent;
use domain::ratelimit::status::{
    ClientStats, HistoryRecord, RateLimitHistory, RateLimitStatus,
};
use ports::secondary::clock::Clock;
use ports::secondary::read_model_store::ReadModelStore;

#[derive(Default)]
struct Projection {
    statuses: HashMap<String, RateLimitStatus>,
    history: HashMap<String, Vec<HistoryRecord>>,
    stats: HashMap<String, ClientStats>,
    /// `(aggregate_id, version)` pairs already folded, for idempotence
    /// under duplicate delivery.
    seen: HashSet<(String, u64)>,
}

/// In-memory projection of the event stream.
///
/// Statuses, history, and stats are mutated under one lock per event to
/// keep the three indices mutually consistent.
pub struct InMemoryReadModel {
    inner: RwLock<Projection>,
    clock: Arc<dyn Clock>,
}

impl InMemoryReadModel {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Projection::default()),
            clock,
        }
    }

    fn locked_err() -> DomainError {
        DomainError::Internal("read model lock poisoned".to_string())
    }
}

impl ReadModelStore for InMemoryReadModel {
    fn get_status(&self, client_id: &str, resource: &str) -> Result<RateLimitStatus, DomainError> {
        let inner = self.inner.read().map_err(|_| Self::locked_err())?;
        let key = aggregate_id(client_id, resource);
        Ok(inner
            .statuses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| RateLimitStatus::default_for(client_id, resource, self.clock.now())))
    }

    fn get_history(
        &self,
        client_id: &str,
        resource: &str,
        start_time: SystemTime,
        end_time: SystemTime,
        limit: usize,
        offset: usize,
    ) -> Result<RateLimitHistory, DomainError> {
        let inner = self.inner.read().map_err(|_| Self::locked_err())?;
        let key = aggregate_id(client_id, resource);
        let filtered: Vec<&HistoryRecord> = inner
            .history
            .get(&key)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.timestamp > start_time && r.timestamp < end_time)
                    .collect()
            })
            .unwrap_or_default();

        let total_count = filtered.len();
        if offset >= total_count {
            return Ok(RateLimitHistory {
                records: Vec::new(),
                total_count,
                has_more: false,
            });
        }
        let end = (offset + limit).min(total_count);
        Ok(RateLimitHistory {
            records: filtered[offset..end].iter().map(|r| (*r).clone()).collect(),
            total_count,
            has_more: end < total_count,
        })
    }

    fn get_client_stats(
        &self,
        client_id: &str,
        _start_time: SystemTime,
        _end_time: SystemTime,
    ) -> Result<ClientStats, DomainError> {
        let inner = self.inner.read().map_err(|_| Self::locked_err())?;
        Ok(inner
            .stats
            .get(client_id)
            .cloned()
            .unwrap_or_else(|| ClientStats::new(client_id)))
    }

    fn apply_event(&self, event: &RateLimitEvent) -> Result<(), DomainError> {
        let mut inner = self.inner.write().map_err(|_| Self::locked_err())?;
        let meta = event.meta();
        let dedup_key = (meta.aggregate_id.clone(), meta.version);
        if !inner.seen.insert(dedup_key) {
            return Ok(());
        }

        let key = aggregate_id(event.client_id(), event.resource());
        match event {
            RateLimitEvent::RateLimitApplied { .. } => {
                let status = RateLimitStatus::from_event(event, self.clock.now());
                inner.statuses.insert(key.clone(), status);
                inner
                    .history
                    .entry(key)
                    .or_default()
                    .push(HistoryRecord::from_event(event));
                inner
                    .stats
                    .entry(event.client_id().to_string())
                    .or_insert_with(|| ClientStats::new(event.client_id()))
                    .record(event.resource(), true, meta.timestamp);
            }
            RateLimitEvent::RateLimitExceeded { .. } => {
                let status = RateLimitStatus::from_event(event, self.clock.now());
                inner.statuses.insert(key.clone(), status);
                inner
                    .history
                    .entry(key)
                    .or_default()
                    .push(HistoryRecord::from_event(event));
                inner
                    .stats
                    .entry(event.client_id().to_string())
                    .or_insert_with(|| ClientStats::new(event.client_id()))
                    .record(event.resource(), false, meta.timestamp);
            }
            RateLimitEvent::RateLimitWindowReset { window_start, .. } => {
                // Resets clear the existing status in place; stats are not
                // request decisions and stay untouched.
                if let Some(status) = inner.statuses.get_mut(&key) {
                    status.is_allowed = true;
                    status.request_count = 0;
                    status.remaining_quota = status.limit;
                    status.window_start = *window_start;
                    status.window_end = *window_start;
                    status.reset_time = *window_start;
                    status.is_blocked = false;
                    status.blocked_until = None;
                    status.retry_after_secs = 0;
                }
                inner
                    .history
                    .entry(key)
                    .or_default()
                    .push(HistoryRecord::from_event(event));
            }
        }
        Ok(())
    }
}
