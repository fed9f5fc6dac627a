use domain::common::error::DomainError;
use domain::ratelimit::event::RateLimitEvent;

/// Append-only store for per-aggregate event streams.
///
/// The expected-version check and the append are one atomic operation, so
/// concurrent writers to the same aggregate race on a single winner and the
/// losers observe `DomainError::ConcurrencyConflict`.
pub trait EventStore: Send + Sync {
    /// Append `events` to the stream of `aggregate_id`, failing with
    /// `ConcurrencyConflict` iff the current stream length differs from
    /// `expected_version`.
    fn save_events(
        &self,
        aggregate_id: &str,
        events: &[RateLimitEvent],
        expected_version: u64,
    ) -> Result<(), DomainError>;

    /// All events for `aggregate_id` in insertion order; empty for unknown
    /// aggregates.
    fn get_events(&self, aggregate_id: &str) -> Result<Vec<RateLimitEvent>, DomainError>;
}
