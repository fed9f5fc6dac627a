use thiserror::Error;

/// Error taxonomy for the admission decision pipeline.
///
/// Concurrency conflicts are the only retryable variant; everything else
/// either maps to a caller mistake or an internal failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("concurrency conflict: expected version {expected}, found {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },

    #[error("no rate limit rules found for resource: {0}")]
    NoRulesForResource(String),

    #[error("invalid rule definition: {0}")]
    InvalidRuleDefinition(String),

    #[error("subscriber overflow: {0}")]
    SubscriberOverflow(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Whether the operation may be retried after re-reading current state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retryable() {
        let err = DomainError::ConcurrencyConflict {
            expected: 3,
            actual: 4,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn other_variants_are_not_retryable() {
        assert!(!DomainError::InvalidInput("x".into()).is_retryable());
        assert!(!DomainError::NotFound("x".into()).is_retryable());
        assert!(!DomainError::NoRulesForResource("login".into()).is_retryable());
        assert!(!DomainError::Internal("x".into()).is_retryable());
    }

    #[test]
    fn conflict_message_carries_versions() {
        let err = DomainError::ConcurrencyConflict {
            expected: 1,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected version 1"));
        assert!(msg.contains("found 2"));
    }

    #[test]
    fn no_rules_message_names_resource() {
        let err = DomainError::NoRulesForResource("upload".into());
        assert!(err.to_string().contains("upload"));
    }
}
