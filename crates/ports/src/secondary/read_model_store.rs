use std::time::SystemTime;

use domain::common::error::DomainError;
use domain::ratelimit::event::RateLimitEvent;
use domain::ratelimit::status::{ClientStats, RateLimitHistory, RateLimitStatus};

/// Projection of the event stream into status, history, and statistics.
///
/// Implementations must be idempotent under duplicate delivery: events are
/// deduplicated by `(aggregate_id, version)` because the bus delivers
/// at-most-once per subscriber but the same event may reach the projection
/// over more than one path.
pub trait ReadModelStore: Send + Sync {
    /// Current status for a key; a default allowed status when the key has
    /// never been seen.
    fn get_status(&self, client_id: &str, resource: &str) -> Result<RateLimitStatus, DomainError>;

    /// History records for a key with timestamps strictly inside
    /// `(start_time, end_time)`, paginated by `offset`/`limit`.
    fn get_history(
        &self,
        client_id: &str,
        resource: &str,
        start_time: SystemTime,
        end_time: SystemTime,
        limit: usize,
        offset: usize,
    ) -> Result<RateLimitHistory, DomainError>;

    /// Aggregated totals and minute-bucketed series for a client.
    fn get_client_stats(
        &self,
        client_id: &str,
        start_time: SystemTime,
        end_time: SystemTime,
    ) -> Result<ClientStats, DomainError>;

    /// Fold one event into all three indices atomically.
    fn apply_event(&self, event: &RateLimitEvent) -> Result<(), DomainError>;
}
