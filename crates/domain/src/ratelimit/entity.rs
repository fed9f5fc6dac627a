use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::common::entity::RuleId;
use crate::common::error::DomainError;

/// Windowing algorithm of a rate-limit rule.
///
/// Fixed and sliding window share quantized window bounds; token bucket and
/// leaky bucket are accepted in configuration but not yet distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    TokenBucket,
    #[default]
    SlidingWindow,
    FixedWindow,
    LeakyBucket,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TokenBucket => "token_bucket",
            Self::SlidingWindow => "sliding_window",
            Self::FixedWindow => "fixed_window",
            Self::LeakyBucket => "leaky_bucket",
        }
    }

    /// Parse an algorithm name. Unknown names fall back to the default
    /// sliding window.
    pub fn parse_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "token_bucket" | "tokenbucket" => Self::TokenBucket,
            "fixed_window" | "fixedwindow" => Self::FixedWindow,
            "leaky_bucket" | "leakybucket" => Self::LeakyBucket,
            _ => Self::SlidingWindow,
        }
    }
}

/// An engine-configured rate-limit rule: a quota of `limit` requests per
/// `window` for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub id: RuleId,
    pub resource: String,
    /// Requests admitted per window. Zero is legal and denies everything.
    pub limit: u32,
    pub window: Duration,
    pub algorithm: Algorithm,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl RateLimitRule {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.id
            .validate()
            .map_err(|reason| DomainError::InvalidRuleDefinition(reason.to_string()))?;
        if self.resource.is_empty() {
            return Err(DomainError::InvalidRuleDefinition(
                "resource must not be empty".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(DomainError::InvalidRuleDefinition(
                "window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Admitted requests per second; the rule with the smallest value is the
    /// most restrictive one for a resource.
    pub fn restrictiveness(&self) -> f64 {
        f64::from(self.limit) / self.window.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn make_rule(id: &str, limit: u32, window: Duration) -> RateLimitRule {
        RateLimitRule {
            id: RuleId(id.to_string()),
            resource: "api".to_string(),
            limit,
            window,
            algorithm: Algorithm::default(),
            created_at: UNIX_EPOCH,
            updated_at: UNIX_EPOCH,
        }
    }

    #[test]
    fn validate_ok() {
        assert!(
            make_rule("rl-001", 100, Duration::from_secs(60))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn validate_zero_limit_is_legal() {
        // A zero quota is a valid way to shut a resource off.
        assert!(
            make_rule("rl-001", 0, Duration::from_secs(60))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn validate_empty_id() {
        assert!(
            make_rule("", 100, Duration::from_secs(60))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn validate_empty_resource() {
        let mut rule = make_rule("rl-001", 100, Duration::from_secs(60));
        rule.resource = String::new();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_zero_window() {
        assert!(make_rule("rl-001", 100, Duration::ZERO).validate().is_err());
    }

    #[test]
    fn restrictiveness_orders_rules() {
        // 5 per 15 minutes is tighter than 3 per 5 minutes.
        let loose = make_rule("a", 3, Duration::from_secs(300));
        let tight = make_rule("b", 5, Duration::from_secs(900));
        assert!(tight.restrictiveness() < loose.restrictiveness());
    }

    #[test]
    fn algorithm_default_is_sliding_window() {
        assert_eq!(Algorithm::default(), Algorithm::SlidingWindow);
    }

    #[test]
    fn algorithm_parse_known_names() {
        assert_eq!(
            Algorithm::parse_or_default("token_bucket"),
            Algorithm::TokenBucket
        );
        assert_eq!(
            Algorithm::parse_or_default("fixed_window"),
            Algorithm::FixedWindow
        );
        assert_eq!(
            Algorithm::parse_or_default("sliding_window"),
            Algorithm::SlidingWindow
        );
        assert_eq!(
            Algorithm::parse_or_default("leaky_bucket"),
            Algorithm::LeakyBucket
        );
    }

    #[test]
    fn algorithm_parse_unknown_falls_back() {
        assert_eq!(
            Algorithm::parse_or_default("random"),
            Algorithm::SlidingWindow
        );
    }

    #[test]
    fn algorithm_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&Algorithm::FixedWindow).unwrap(),
            "\"fixed_window\""
        );
        let parsed: Algorithm = serde_json::from_str("\"leaky_bucket\"").unwrap();
        assert_eq!(parsed, Algorithm::LeakyBucket);
    }
}
