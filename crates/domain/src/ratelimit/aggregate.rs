use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::entity::RateLimitRule;
use super::event::RateLimitEvent;

/// Compose the aggregate identifier for a `(client, resource)` pair.
pub fn aggregate_id(client_id: &str, resource: &str) -> String {
    format!("{client_id}:{resource}")
}

/// Quantized window bounds containing `now`: the window origin is floored to
/// a multiple of the window length since the epoch.
pub fn window_bounds(now: SystemTime, window: Duration) -> (SystemTime, SystemTime) {
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let window_nanos = window.as_nanos().max(1);
    let start_nanos = (since_epoch.as_nanos() / window_nanos) * window_nanos;
    let start = UNIX_EPOCH + nanos_to_duration(start_nanos);
    (start, start + window)
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = (nanos / 1_000_000_000) as u64;
    let subsec = (nanos % 1_000_000_000) as u32;
    Duration::new(secs, subsec)
}

/// Mutable window state of one `(client, resource)` counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub request_count: u32,
    pub window_start: SystemTime,
    pub window_end: SystemTime,
    pub remaining_quota: u32,
    pub last_request_at: Option<SystemTime>,
    pub is_blocked: bool,
    pub blocked_until: Option<SystemTime>,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            request_count: 0,
            window_start: UNIX_EPOCH,
            window_end: UNIX_EPOCH,
            remaining_quota: 0,
            last_request_at: None,
            is_blocked: false,
            blocked_until: None,
        }
    }
}

/// Event-sourced counter for one `(client, resource)` pair, rebuilt
/// deterministically by replaying its stream in version order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitAggregate {
    pub client_id: String,
    pub resource: String,
    pub state: RateLimitState,
    /// Number of events applied so far.
    pub version: u64,
}

impl RateLimitAggregate {
    pub fn new(client_id: &str, resource: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            resource: resource.to_string(),
            state: RateLimitState::default(),
            version: 0,
        }
    }

    pub fn id(&self) -> String {
        aggregate_id(&self.client_id, &self.resource)
    }

    /// Rebuild an aggregate from its full event stream.
    pub fn rehydrate(client_id: &str, resource: &str, events: &[RateLimitEvent]) -> Self {
        let mut aggregate = Self::new(client_id, resource);
        for event in events {
            aggregate.apply(event);
        }
        aggregate
    }

    /// Apply one event, advancing the version by exactly one.
    pub fn apply(&mut self, event: &RateLimitEvent) {
        match event {
            RateLimitEvent::RateLimitApplied {
                meta,
                window_start,
                window_end,
                request_count,
                remaining_quota,
                ..
            } => {
                self.state.request_count = *request_count;
                self.state.window_start = *window_start;
                self.state.window_end = *window_end;
                self.state.remaining_quota = *remaining_quota;
                self.state.last_request_at = Some(meta.timestamp);
                self.state.is_blocked = false;
                self.state.blocked_until = None;
            }
            RateLimitEvent::RateLimitExceeded {
                request_count,
                window_start,
                window_end,
                blocked_until,
                ..
            } => {
                self.state.request_count = *request_count;
                self.state.window_start = *window_start;
                self.state.window_end = *window_end;
                self.state.is_blocked = true;
                self.state.blocked_until = Some(*blocked_until);
            }
            RateLimitEvent::RateLimitWindowReset { window_start, .. } => {
                self.state.request_count = 0;
                self.state.window_start = *window_start;
                // Collapse the window so the next request opens a fresh one.
                self.state.window_end = *window_start;
                self.state.remaining_quota = 0;
                self.state.is_blocked = false;
                self.state.blocked_until = None;
            }
        }
        self.version += 1;
    }

    /// Whether a request arriving at `now` may be admitted under `rule`.
    ///
    /// A blocked aggregate refuses until `blocked_until` passes. An expired
    /// window implicitly resets (but a zero quota still admits nothing).
    /// Otherwise the remaining quota decides.
    pub fn can_make_request(&self, rule: &RateLimitRule, now: SystemTime) -> bool {
        if self.state.is_blocked
            && let Some(until) = self.state.blocked_until
            && now < until
        {
            return false;
        }

        if now > self.state.window_end {
            return rule.limit > 0;
        }

        self.state.remaining_quota > 0
    }
}
