use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::ratelimit::entity::Algorithm;
use domain::rules::entity::{
    ActionType, ConditionOperator, Rule, RuleAction, RuleCondition, RuleType,
};
use serde_json::json;

use crate::limiter_service_impl::RateLimiterService;
use crate::rule_service_impl::RuleEngineService;

/// Install the default rate-limit and security rules at startup.
///
/// Rate limits: `api` 100/min sliding, `login` 5/15min fixed,
/// `upload` 10/hour sliding. Security rules: deny bot user agents,
/// tighten login to 3/5min, allow the internal 192.168.0.0/16 range.
pub fn seed_defaults(
    limiter: &RateLimiterService,
    rules: &RuleEngineService,
    now: SystemTime,
) -> Result<(), DomainError> {
    limiter.create_rule("api", 100, Duration::from_secs(60), Algorithm::SlidingWindow)?;
    limiter.create_rule("login", 5, Duration::from_secs(900), Algorithm::FixedWindow)?;
    limiter.create_rule("upload", 10, Duration::from_secs(3600), Algorithm::SlidingWindow)?;

    rules.create_rule(Rule {
        id: RuleId("block-suspicious-agents".to_string()),
        name: "Block Suspicious User Agents".to_string(),
        rule_type: RuleType::Blacklist,
        description: "Block requests from suspicious user agents".to_string(),
        priority: 200,
        enabled: true,
        conditions: vec![RuleCondition {
            field: "user_agent".to_string(),
            operator: ConditionOperator::Contains,
            value: json!("bot"),
        }],
        actions: vec![RuleAction {
            kind: ActionType::Deny,
            parameters: HashMap::from([(
                "reason".to_string(),
                json!("suspicious user agent"),
            )]),
        }],
        tags: vec!["security".to_string(), "user-agent".to_string()],
        created_at: now,
        updated_at: now,
    })?;

    rules.create_rule(Rule {
        id: RuleId("aggressive-login-rate-limit".to_string()),
        name: "Aggressive Login Rate Limiting".to_string(),
        rule_type: RuleType::RateLimit,
        description: "Apply stricter rate limiting for login endpoints".to_string(),
        priority: 150,
        enabled: true,
        conditions: vec![RuleCondition {
            field: "resource".to_string(),
            operator: ConditionOperator::Equals,
            value: json!("login"),
        }],
        actions: vec![RuleAction {
            kind: ActionType::RateLimit,
            parameters: HashMap::from([
                ("limit".to_string(), json!(3)),
                ("window".to_string(), json!("5m")),
                ("algorithm".to_string(), json!("fixed_window")),
            ]),
        }],
        tags: vec!["security".to_string(), "login".to_string()],
        created_at: now,
        updated_at: now,
    })?;

    rules.create_rule(Rule {
        id: RuleId("whitelist-internal-ips".to_string()),
        name: "Whitelist Internal IPs".to_string(),
        rule_type: RuleType::Whitelist,
        description: "Allow all requests from internal IP ranges".to_string(),
        priority: 300,
        enabled: true,
        conditions: vec![RuleCondition {
            field: "ip_address".to_string(),
            operator: ConditionOperator::StartsWith,
            value: json!("192.168."),
        }],
        actions: vec![RuleAction {
            kind: ActionType::Allow,
            parameters: HashMap::from([("reason".to_string(), json!("internal IP"))]),
        }],
        tags: vec!["security".to_string(), "whitelist".to_string()],
        created_at: now,
        updated_at: now,
    })?;

    tracing::info!("default rate limits and security rules installed");
    Ok(())
}
