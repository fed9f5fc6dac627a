use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::ratelimit::entity::{Algorithm, RateLimitRule};
use domain::ratelimit::status::RateLimitStatus;
use domain::rules::entity::{
    ActionType, ConditionOperator, Rule, RuleAction, RuleCondition, RuleEvaluationContext,
    RuleEvaluationResult, RuleType,
};
use ports::secondary::clock::Clock;
use ports::secondary::metrics_port::MetricsPort;
use ports::secondary::rate_limit_rule_store::RateLimitRuleStore;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::limiter_service_impl::RateLimiterService;
use crate::rule_service_impl::RuleEngineService;

/// The admission decision for one request.
#[derive(Debug, Clone)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub reason: String,
    pub rule_results: Vec<RuleEvaluationResult>,
    pub rate_limit_status: Option<RateLimitStatus>,
    pub blocking_rule_id: Option<RuleId>,
}

/// Integrated admission service: composes the rule engine and the rate
/// limiter into a single allow/deny decision per request.
pub struct AdmissionService {
    limiter: RateLimiterService,
    rule_engine: RuleEngineService,
    rate_limit_rules: Arc<dyn RateLimitRuleStore>,
    metrics: Arc<dyn MetricsPort>,
    clock: Arc<dyn Clock>,
}

impl AdmissionService {
    pub fn new(
        limiter: RateLimiterService,
        rule_engine: RuleEngineService,
        rate_limit_rules: Arc<dyn RateLimitRuleStore>,
        metrics: Arc<dyn MetricsPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            limiter,
            rule_engine,
            rate_limit_rules,
            metrics,
            clock,
        }
    }

    pub fn limiter(&self) -> &RateLimiterService {
        &self.limiter
    }

    pub fn rule_engine(&self) -> &RuleEngineService {
        &self.rule_engine
    }

    /// Decide one request.
    ///
    /// Order matters: security rules evaluate first, and any matched
    /// `deny`/`block` short-circuits before the rate-limit aggregate is
    /// touched. Matched `rate_limit` actions install the dynamic rule for
    /// the resource before the counter is consulted.
    pub fn check_request_with_rules(
        &self,
        client_id: &str,
        resource: &str,
        ip_address: &str,
        user_agent: &str,
        metadata: HashMap<String, String>,
        request_data: HashMap<String, Value>,
    ) -> Result<AdmissionDecision, DomainError> {
        let ctx = RuleEvaluationContext {
            client_id: client_id.to_string(),
            resource: resource.to_string(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            timestamp: self.clock.now(),
            metadata,
            request_data,
        };

        let rule_results = self.rule_engine.evaluate_rules(&ctx)?;

        if RuleEngineService::has_blocking_action(&rule_results) {
            self.metrics.record_decision(resource, "blocked_by_rule");
            return Ok(AdmissionDecision {
                allowed: false,
                reason: "blocked by rule".to_string(),
                blocking_rule_id: first_blocking_rule_id(&rule_results),
                rule_results,
                rate_limit_status: None,
            });
        }

        let rate_limit_actions = RuleEngineService::rate_limit_actions(&rule_results);
        if !rate_limit_actions.is_empty() {
            self.install_dynamic_rules(&rate_limit_actions, resource)?;
        }

        let status = match self
            .limiter
            .check_rate_limit(client_id, resource, ip_address, user_agent)
        {
            Ok(status) => status,
            Err(DomainError::NoRulesForResource(_)) if has_allow_action(&rule_results) => {
                // An unconfigured resource passes only on an explicit allow.
                self.metrics.record_decision(resource, "allowed");
                return Ok(AdmissionDecision {
                    allowed: true,
                    reason: "allowed by rule".to_string(),
                    rule_results,
                    rate_limit_status: None,
                    blocking_rule_id: None,
                });
            }
            Err(err) => return Err(err),
        };

        let allowed = status.is_allowed;
        let reason = decision_reason(&status, &rule_results);
        self.metrics
            .record_decision(resource, if allowed { "allowed" } else { "rate_limited" });

        Ok(AdmissionDecision {
            allowed,
            reason,
            rule_results,
            rate_limit_status: Some(status),
            blocking_rule_id: None,
        })
    }

    /// Reify matched `rate_limit` actions as the dynamic rule for the
    /// resource. The rule lives under the deterministic id
    /// `dyn-<resource>`, and other rules for the resource are removed, so
    /// the most recently installed dynamic rule is the effective one and
    /// repeated matches never accumulate duplicates.
    fn install_dynamic_rules(
        &self,
        actions: &[RuleAction],
        resource: &str,
    ) -> Result<(), DomainError> {
        for action in actions {
            let Some((limit, window, algorithm)) = parse_rate_limit_parameters(action) else {
                tracing::debug!(resource, "skipping rate_limit action with unusable parameters");
                continue;
            };

            let dynamic_id = RuleId::dynamic(resource);
            let now = self.clock.now();
            let rule = RateLimitRule {
                id: dynamic_id.clone(),
                resource: resource.to_string(),
                limit,
                window,
                algorithm,
                created_at: now,
                updated_at: now,
            };

            for existing in self.rate_limit_rules.get_by_resource(resource)? {
                if existing.id != dynamic_id {
                    self.rate_limit_rules.delete(&existing.id)?;
                }
            }
            self.rate_limit_rules.save(rule)?;
            tracing::debug!(resource, limit, "dynamic rate limit rule installed");
        }
        Ok(())
    }

    /// Install a named security rule.
    pub fn create_security_rule(
        &self,
        name: &str,
        description: &str,
        conditions: Vec<RuleCondition>,
        actions: Vec<RuleAction>,
        priority: i32,
    ) -> Result<RuleId, DomainError> {
        let now = self.clock.now();
        self.rule_engine.create_rule(Rule {
            id: RuleId(format!("security-rule-{}", Uuid::new_v4())),
            name: name.to_string(),
            rule_type: RuleType::RateLimit,
            description: description.to_string(),
            priority,
            enabled: true,
            conditions,
            actions,
            tags: vec!["security".to_string(), "auto-generated".to_string()],
            created_at: now,
            updated_at: now,
        })
    }

    /// Install a blacklist (`block`) or `rate_limit` rule keyed on a set of
    /// IP addresses.
    pub fn create_ip_based_rule(
        &self,
        ip_addresses: &[String],
        action: ActionType,
        parameters: HashMap<String, Value>,
    ) -> Result<RuleId, DomainError> {
        if ip_addresses.is_empty() {
            return Err(DomainError::InvalidInput(
                "at least one IP address is required".to_string(),
            ));
        }
        if !matches!(action, ActionType::Block | ActionType::Deny | ActionType::RateLimit) {
            return Err(DomainError::InvalidInput(format!(
                "unsupported IP rule action: {action:?}"
            )));
        }

        let now = self.clock.now();
        self.rule_engine.create_rule(Rule {
            id: RuleId(format!("ip-rule-{}", Uuid::new_v4())),
            name: "IP-based rule".to_string(),
            rule_type: RuleType::Blacklist,
            description: "IP-based admission rule".to_string(),
            priority: 100,
            enabled: true,
            conditions: vec![RuleCondition {
                field: "ip_address".to_string(),
                operator: ConditionOperator::In,
                value: Value::Array(
                    ip_addresses.iter().map(|ip| json!(ip)).collect(),
                ),
            }],
            actions: vec![RuleAction {
                kind: if action == ActionType::RateLimit {
                    ActionType::RateLimit
                } else {
                    ActionType::Deny
                },
                parameters,
            }],
            tags: vec!["ip-based".to_string(), "auto-generated".to_string()],
            created_at: now,
            updated_at: now,
        })
    }

    /// Install a `rate_limit` rule that fires for any of the given
    /// resources.
    pub fn create_resource_based_rule(
        &self,
        resources: &[String],
        limit: u32,
        window: Duration,
        algorithm: Algorithm,
    ) -> Result<RuleId, DomainError> {
        if resources.is_empty() {
            return Err(DomainError::InvalidInput(
                "at least one resource is required".to_string(),
            ));
        }

        let now = self.clock.now();
        self.rule_engine.create_rule(Rule {
            id: RuleId(format!("resource-rule-{}", Uuid::new_v4())),
            name: "Resource-based rate limiting rule".to_string(),
            rule_type: RuleType::RateLimit,
            description: "Resource-specific rate limiting rule".to_string(),
            priority: 50,
            enabled: true,
            conditions: vec![RuleCondition {
                field: "resource".to_string(),
                operator: ConditionOperator::In,
                value: Value::Array(resources.iter().map(|r| json!(r)).collect()),
            }],
            actions: vec![RuleAction {
                kind: ActionType::RateLimit,
                parameters: HashMap::from([
                    ("limit".to_string(), json!(limit)),
                    (
                        "window".to_string(),
                        json!(humantime::format_duration(window).to_string()),
                    ),
                    ("algorithm".to_string(), json!(algorithm.as_str())),
                ]),
            }],
            tags: vec!["resource-based".to_string(), "auto-generated".to_string()],
            created_at: now,
            updated_at: now,
        })
    }
}

/// The first matched result carrying a `deny`/`block` action, in
/// evaluation order.
fn first_blocking_rule_id(results: &[RuleEvaluationResult]) -> Option<RuleId> {
    results
        .iter()
        .filter(|result| result.matched)
        .find(|result| result.actions.iter().any(|action| action.kind.is_blocking()))
        .map(|result| result.rule_id.clone())
}

fn has_allow_action(results: &[RuleEvaluationResult]) -> bool {
    results
        .iter()
        .filter(|result| result.matched)
        .any(|result| result.actions.iter().any(|action| action.kind == ActionType::Allow))
}

fn decision_reason(status: &RateLimitStatus, results: &[RuleEvaluationResult]) -> String {
    if !status.is_allowed {
        return "rate limited".to_string();
    }
    for result in results.iter().filter(|result| result.matched) {
        for action in &result.actions {
            match action.kind {
                ActionType::Allow => return "allowed by rule".to_string(),
                ActionType::Throttle => return "throttled by rule".to_string(),
                _ => {}
            }
        }
    }
    "allowed".to_string()
}

/// Coerce `{limit, window, algorithm}` out of an action's loosely typed
/// parameters. `limit` may be a number or numeric string; `window` a
/// humantime string or seconds; `algorithm` defaults to sliding window.
fn parse_rate_limit_parameters(action: &RuleAction) -> Option<(u32, Duration, Algorithm)> {
    let limit = match action.parameters.get("limit")? {
        Value::Number(n) => {
            let limit = n.as_f64()?;
            if limit < 0.0 {
                return None;
            }
            limit as u32
        }
        Value::String(s) => s.parse::<u32>().ok()?,
        _ => return None,
    };

    let window = match action.parameters.get("window")? {
        Value::String(s) => humantime::parse_duration(s).ok()?,
        Value::Number(n) => {
            let secs = n.as_f64()?;
            if secs <= 0.0 {
                return None;
            }
            Duration::from_secs_f64(secs)
        }
        _ => return None,
    };

    // A zero limit is a legitimate kill-switch; only a zero window has no
    // valid quantized bounds.
    if window.is_zero() {
        return None;
    }

    let algorithm = match action.parameters.get("algorithm") {
        Some(Value::String(s)) => Algorithm::parse_or_default(s),
        _ => Algorithm::SlidingWindow,
    };

    Some((limit, window, algorithm))
}
