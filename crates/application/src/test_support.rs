//! Minimal conforming port implementations for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::ratelimit::entity::{Algorithm, RateLimitRule};
use domain::ratelimit::event::RateLimitEvent;
use ports::secondary::event_store::EventStore;
use ports::secondary::rate_limit_rule_store::RateLimitRuleStore;

pub(crate) fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub(crate) fn make_rule(id: &str, resource: &str, limit: u32, window_secs: u64) -> RateLimitRule {
    RateLimitRule {
        id: RuleId(id.to_string()),
        resource: resource.to_string(),
        limit,
        window: Duration::from_secs(window_secs),
        algorithm: Algorithm::default(),
        created_at: UNIX_EPOCH,
        updated_at: UNIX_EPOCH,
    }
}

#[derive(Default)]
pub(crate) struct InMemoryEvents {
    streams: Mutex<HashMap<String, Vec<RateLimitEvent>>>,
}

impl EventStore for InMemoryEvents {
    fn save_events(
        &self,
        aggregate_id: &str,
        events: &[RateLimitEvent],
        expected_version: u64,
    ) -> Result<(), DomainError> {
        let mut streams = self.streams.lock().expect("lock poisoned");
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
        let streams = self.streams.lock().expect("lock poisoned");
        Ok(streams.get(aggregate_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryRules {
    rules: Mutex<HashMap<String, RateLimitRule>>,
}

impl RateLimitRuleStore for InMemoryRules {
    fn save(&self, rule: RateLimitRule) -> Result<(), DomainError> {
        let mut rules = self.rules.lock().expect("lock poisoned");
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }

    fn get_by_resource(&self, resource: &str) -> Result<Vec<RateLimitRule>, DomainError> {
        let rules = self.rules.lock().expect("lock poisoned");
        let mut matching: Vec<RateLimitRule> = rules
            .values()
            .filter(|r| r.resource == resource)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(matching)
    }

    fn get_by_id(&self, id: &RuleId) -> Result<RateLimitRule, DomainError> {
        let rules = self.rules.lock().expect("lock poisoned");
        rules
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("rule {id}")))
    }

    fn update(&self, rule: RateLimitRule) -> Result<(), DomainError> {
        let mut rules = self.rules.lock().expect("lock poisoned");
        if !rules.contains_key(&rule.id.0) {
            return Err(DomainError::NotFound(format!("rule {}", rule.id)));
        }
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }

    fn delete(&self, id: &RuleId) -> Result<(), DomainError> {
        let mut rules = self.rules.lock().expect("lock poisoned");
        rules
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("rule {id}")))
    }
}

/// Read model fixture: one canned status plus a log of applied events.
#[derive(Default)]
pub(crate) struct StubReadModel {
    status: Mutex<Option<domain::ratelimit::status::RateLimitStatus>>,
    pub(crate) applied: Mutex<Vec<RateLimitEvent>>,
}

impl StubReadModel {
    pub(crate) fn set_status(&self, status: domain::ratelimit::status::RateLimitStatus) {
        *self.status.lock().expect("lock poisoned") = Some(status);
    }
}

impl ports::secondary::read_model_store::ReadModelStore for StubReadModel {
    fn get_status(
        &self,
        client_id: &str,
        resource: &str,
    ) -> Result<domain::ratelimit::status::RateLimitStatus, DomainError> {
        Ok(self
            .status
            .lock()
            .expect("lock poisoned")
            .clone()
            .unwrap_or_else(|| {
                domain::ratelimit::status::RateLimitStatus::default_for(
                    client_id,
                    resource,
                    UNIX_EPOCH,
                )
            }))
    }

    fn get_history(
        &self,
        _client_id: &str,
        _resource: &str,
        _start_time: SystemTime,
        _end_time: SystemTime,
        _limit: usize,
        _offset: usize,
    ) -> Result<domain::ratelimit::status::RateLimitHistory, DomainError> {
        Ok(domain::ratelimit::status::RateLimitHistory {
            records: Vec::new(),
            total_count: 0,
            has_more: false,
        })
    }

    fn get_client_stats(
        &self,
        client_id: &str,
        _start_time: SystemTime,
        _end_time: SystemTime,
    ) -> Result<domain::ratelimit::status::ClientStats, DomainError> {
        Ok(domain::ratelimit::status::ClientStats::new(client_id))
    }

    fn apply_event(&self, event: &RateLimitEvent) -> Result<(), DomainError> {
        self.applied
            .lock()
            .expect("lock poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// Event-store wrapper that runs `inject` once right before the first
/// append, simulating a competing writer winning the race.
pub(crate) struct ConflictOnce<F> {
    inner: Arc<InMemoryEvents>,
    injected: AtomicBool,
    inject: F,
}

impl<F> ConflictOnce<F>
where
    F: Fn(&InMemoryEvents) + Send + Sync,
{
    pub(crate) fn new(inner: Arc<InMemoryEvents>, inject: F) -> Self {
        Self {
            inner,
            injected: AtomicBool::new(false),
            inject,
        }
    }
}

impl<F> EventStore for ConflictOnce<F>
where
    F: Fn(&InMemoryEvents) + Send + Sync,
{
    fn save_events(
        &self,
        aggregate_id: &str,
        events: &[RateLimitEvent],
        expected_version: u64,
    ) -> Result<(), DomainError> {
        if !self.injected.swap(true, Ordering::SeqCst) {
            (self.inject)(&self.inner);
        }
        self.inner.save_events(aggregate_id, events, expected_version)
    }

    fn get_events(&self, aggregate_id: &str) -> Result<Vec<RateLimitEvent>, DomainError> {
        self.inner.get_events(aggregate_id)
    }
}
