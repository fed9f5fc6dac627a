use domain::common::error::DomainError;
use domain::ratelimit::event::RateLimitEvent;
use domain::rules::entity::RuleEvaluationResult;

/// Outbound channel for persisted rate-limit events.
///
/// Publishing is best-effort: failures are reported but callers log and
/// continue, they never abort the write path.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &RateLimitEvent) -> Result<(), DomainError>;
}

/// Outbound channel for rule-engine evaluation events.
pub trait RuleEventSink: Send + Sync {
    fn publish_rule_evaluated(&self, result: &RuleEvaluationResult) -> Result<(), DomainError>;

    fn publish_rule_matched(&self, result: &RuleEvaluationResult) -> Result<(), DomainError>;
}
