use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use domain::common::error::DomainError;
use domain::ratelimit::event::RateLimitEvent;
use domain::rules::entity::RuleEvaluationResult;

use crate::secondary::clock::Clock;
use crate::secondary::event_sink::{EventSink, RuleEventSink};
use crate::secondary::metrics_port::{AdmissionMetrics, EventMetrics, RuleMetrics};

/// No-op implementation of all metrics sub-traits for use in tests.
pub struct NoopMetrics;

impl AdmissionMetrics for NoopMetrics {}
impl RuleMetrics for NoopMetrics {}
impl EventMetrics for NoopMetrics {}

/// Event sink that discards everything.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: &RateLimitEvent) -> Result<(), DomainError> {
        Ok(())
    }
}

impl RuleEventSink for NoopEventSink {
    fn publish_rule_evaluated(&self, _result: &RuleEvaluationResult) -> Result<(), DomainError> {
        Ok(())
    }

    fn publish_rule_matched(&self, _result: &RuleEvaluationResult) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Hand-driven clock for deterministic window math in tests.
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn starting_at(now: SystemTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += by;
    }

    pub fn set(&self, to: SystemTime) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().expect("clock lock poisoned")
    }
}
