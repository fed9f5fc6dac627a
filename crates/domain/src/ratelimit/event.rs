use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Identity and ordering data carried by every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub id: String,
    pub aggregate_id: String,
    /// Position in the aggregate's stream; equals the stream length after
    /// this event is appended.
    pub version: u64,
    pub timestamp: SystemTime,
}

/// The closed set of rate-limit events. Events are immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RateLimitEvent {
    /// A request was admitted and counted against the window.
    RateLimitApplied {
        meta: EventMeta,
        client_id: String,
        resource: String,
        window_start: SystemTime,
        window_end: SystemTime,
        request_count: u32,
        limit: u32,
        remaining_quota: u32,
    },
    /// A request was refused; the client is blocked until the window ends.
    RateLimitExceeded {
        meta: EventMeta,
        client_id: String,
        resource: String,
        request_count: u32,
        limit: u32,
        window_start: SystemTime,
        window_end: SystemTime,
        blocked_until: SystemTime,
    },
    /// The counter was reset out of band.
    RateLimitWindowReset {
        meta: EventMeta,
        client_id: String,
        resource: String,
        window_start: SystemTime,
    },
}

impl RateLimitEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            Self::RateLimitApplied { meta, .. }
            | Self::RateLimitExceeded { meta, .. }
            | Self::RateLimitWindowReset { meta, .. } => meta,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RateLimitApplied { .. } => "RateLimitApplied",
            Self::RateLimitExceeded { .. } => "RateLimitExceeded",
            Self::RateLimitWindowReset { .. } => "RateLimitWindowReset",
        }
    }

    pub fn client_id(&self) -> &str {
        match self {
            Self::RateLimitApplied { client_id, .. }
            | Self::RateLimitExceeded { client_id, .. }
            | Self::RateLimitWindowReset { client_id, .. } => client_id,
        }
    }

    pub fn resource(&self) -> &str {
        match self {
            Self::RateLimitApplied { resource, .. }
            | Self::RateLimitExceeded { resource, .. }
            | Self::RateLimitWindowReset { resource, .. } => resource,
        }
    }

    /// Whether this event records a refused request.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }
}
