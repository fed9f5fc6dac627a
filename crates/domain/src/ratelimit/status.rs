use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::aggregate::window_bounds;
use super::event::RateLimitEvent;

/// Query-side view of one `(client, resource)` counter, derived from the
/// event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub client_id: String,
    pub resource: String,
    pub is_allowed: bool,
    pub request_count: u32,
    pub limit: u32,
    pub remaining_quota: u32,
    pub window_start: SystemTime,
    pub window_end: SystemTime,
    pub reset_time: SystemTime,
    pub is_blocked: bool,
    pub blocked_until: Option<SystemTime>,
    pub retry_after_secs: u64,
}

impl RateLimitStatus {
    /// Status for a key with no recorded events: allowed, empty counters.
    pub fn default_for(client_id: &str, resource: &str, now: SystemTime) -> Self {
        let window_end = now + Duration::from_secs(3600);
        Self {
            client_id: client_id.to_string(),
            resource: resource.to_string(),
            is_allowed: true,
            request_count: 0,
            limit: 0,
            remaining_quota: 0,
            window_start: now,
            window_end,
            reset_time: window_end,
            is_blocked: false,
            blocked_until: None,
            retry_after_secs: 0,
        }
    }

    /// Project a single event into the status it implies. `now` is only used
    /// to compute the retry-after horizon for denials.
    pub fn from_event(event: &RateLimitEvent, now: SystemTime) -> Self {
        match event {
            RateLimitEvent::RateLimitApplied {
                client_id,
                resource,
                window_start,
                window_end,
                request_count,
                limit,
                remaining_quota,
                ..
            } => Self {
                client_id: client_id.clone(),
                resource: resource.clone(),
                is_allowed: true,
                request_count: *request_count,
                limit: *limit,
                remaining_quota: *remaining_quota,
                window_start: *window_start,
                window_end: *window_end,
                reset_time: *window_end,
                is_blocked: false,
                blocked_until: None,
                retry_after_secs: 0,
            },
            RateLimitEvent::RateLimitExceeded {
                client_id,
                resource,
                request_count,
                limit,
                window_start,
                window_end,
                blocked_until,
                ..
            } => Self {
                client_id: client_id.clone(),
                resource: resource.clone(),
                is_allowed: false,
                request_count: *request_count,
                limit: *limit,
                remaining_quota: 0,
                window_start: *window_start,
                window_end: *window_end,
                reset_time: *window_end,
                is_blocked: true,
                blocked_until: Some(*blocked_until),
                retry_after_secs: retry_after(*blocked_until, now),
            },
            RateLimitEvent::RateLimitWindowReset {
                client_id,
                resource,
                window_start,
                ..
            } => Self {
                client_id: client_id.clone(),
                resource: resource.clone(),
                is_allowed: true,
                request_count: 0,
                limit: 0,
                remaining_quota: 0,
                window_start: *window_start,
                window_end: *window_start,
                reset_time: *window_start,
                is_blocked: false,
                blocked_until: None,
                retry_after_secs: 0,
            },
        }
    }
}

/// Seconds until `until`, clamped at zero.
pub fn retry_after(until: SystemTime, now: SystemTime) -> u64 {
    until
        .duration_since(now)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One entry in the per-key history projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub event_id: String,
    pub event_type: String,
    pub client_id: String,
    pub resource: String,
    pub timestamp: SystemTime,
    pub request_count: u32,
    pub limit: u32,
    pub is_blocked: bool,
}

impl HistoryRecord {
    pub fn from_event(event: &RateLimitEvent) -> Self {
        let (request_count, limit) = match event {
            RateLimitEvent::RateLimitApplied {
                request_count,
                limit,
                ..
            }
            | RateLimitEvent::RateLimitExceeded {
                request_count,
                limit,
                ..
            } => (*request_count, *limit),
            RateLimitEvent::RateLimitWindowReset { .. } => (0, 0),
        };
        Self {
            event_id: event.meta().id.clone(),
            event_type: event.event_type().to_string(),
            client_id: event.client_id().to_string(),
            resource: event.resource().to_string(),
            timestamp: event.meta().timestamp,
            request_count,
            limit,
            is_blocked: event.is_denial(),
        }
    }
}

/// A page of history records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitHistory {
    pub records: Vec<HistoryRecord>,
    pub total_count: usize,
    pub has_more: bool,
}

/// Per-resource request totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub resource: String,
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub allowed_requests: u64,
    pub blocked_rate: f64,
}

/// One minute bucket of the per-client time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: SystemTime,
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub allowed_requests: u64,
}

/// Per-client totals, per-resource breakdown, and minute-bucketed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientStats {
    pub client_id: String,
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub allowed_requests: u64,
    pub resource_stats: Vec<ResourceStats>,
    pub time_series: Vec<TimeSeriesPoint>,
}

impl ClientStats {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            total_requests: 0,
            blocked_requests: 0,
            allowed_requests: 0,
            resource_stats: Vec::new(),
            time_series: Vec::new(),
        }
    }

    /// Count one decision against the totals, the resource breakdown, and
    /// the minute bucket containing `at`.
    pub fn record(&mut self, resource: &str, allowed: bool, at: SystemTime) {
        self.total_requests += 1;
        if allowed {
            self.allowed_requests += 1;
        } else {
            self.blocked_requests += 1;
        }

        let idx = match self
            .resource_stats
            .iter()
            .position(|s| s.resource == resource)
        {
            Some(idx) => idx,
            None => {
                self.resource_stats.push(ResourceStats {
                    resource: resource.to_string(),
                    total_requests: 0,
                    blocked_requests: 0,
                    allowed_requests: 0,
                    blocked_rate: 0.0,
                });
                self.resource_stats.len() - 1
            }
        };
        let entry = &mut self.resource_stats[idx];
        entry.total_requests += 1;
        if allowed {
            entry.allowed_requests += 1;
        } else {
            entry.blocked_requests += 1;
        }
        entry.blocked_rate = entry.blocked_requests as f64 / entry.total_requests as f64;

        let (bucket, _) = window_bounds(at, Duration::from_secs(60));
        let idx = match self.time_series.iter().position(|p| p.timestamp == bucket) {
            Some(idx) => idx,
            None => {
                self.time_series.push(TimeSeriesPoint {
                    timestamp: bucket,
                    total_requests: 0,
                    blocked_requests: 0,
                    allowed_requests: 0,
                });
                self.time_series.len() - 1
            }
        };
        let point = &mut self.time_series[idx];
        point.total_requests += 1;
        if allowed {
            point.allowed_requests += 1;
        } else {
            point.blocked_requests += 1;
        }
    }
}
