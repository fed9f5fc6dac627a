use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::entity::RuleId;
use crate::common::error::DomainError;

/// Category of a security rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    RateLimit,
    Throttle,
    Blacklist,
    Whitelist,
    Geofence,
    TimeBased,
}

impl RuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Throttle => "throttle",
            Self::Blacklist => "blacklist",
            Self::Whitelist => "whitelist",
            Self::Geofence => "geofence",
            Self::TimeBased => "time_based",
        }
    }
}

/// Comparison operator of a rule condition. The set is closed; anything
/// outside it is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
}

/// Action taken when a rule matches. `Block` is a synonym of `Deny` and is
/// treated identically by the admission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Allow,
    Deny,
    Block,
    RateLimit,
    Throttle,
    Log,
    Alert,
}

impl ActionType {
    /// Whether this action blocks the request outright.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Deny | Self::Block)
    }
}

/// A single predicate: all conditions of a rule must hold for it to match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Context field to inspect. Fixed fields are `client_id`, `resource`,
    /// `ip_address`, `user_agent` and `timestamp`; any other name is looked
    /// up in the request metadata, then in the request data.
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

/// An action attached to a rule, with free-form parameters.
///
/// Parameters are heterogeneously typed on the wire (`limit` may arrive as
/// an integer or a string, `window` as a duration string or seconds); they
/// are coerced at the admission-service boundary, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

/// A security rule: an ordered conjunction of conditions plus the actions
/// to apply on a full match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default)]
    pub description: String,
    /// Higher priority evaluates first.
    pub priority: i32,
    pub enabled: bool,
    pub conditions: Vec<RuleCondition>,
    pub actions: Vec<RuleAction>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Rule {
    /// Structural validation: a well-shaped id, a name, at least one
    /// condition with a non-empty field, and at least one action. Operators
    /// and action types are enums, so membership in the recognized sets is
    /// enforced by construction.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.id
            .validate()
            .map_err(|reason| DomainError::InvalidRuleDefinition(reason.to_string()))?;
        if self.name.is_empty() {
            return Err(DomainError::InvalidRuleDefinition(
                "rule name is required".to_string(),
            ));
        }
        if self.conditions.is_empty() {
            return Err(DomainError::InvalidRuleDefinition(
                "rule must have at least one condition".to_string(),
            ));
        }
        if self.actions.is_empty() {
            return Err(DomainError::InvalidRuleDefinition(
                "rule must have at least one action".to_string(),
            ));
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            if condition.field.is_empty() {
                return Err(DomainError::InvalidRuleDefinition(format!(
                    "condition {i}: field is required"
                )));
            }
        }
        Ok(())
    }
}

/// Request-scoped data a rule is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluationContext {
    pub client_id: String,
    pub resource: String,
    pub ip_address: String,
    pub user_agent: String,
    pub timestamp: SystemTime,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub request_data: HashMap<String, Value>,
}

/// Outcome of evaluating one rule against one context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluationResult {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub matched: bool,
    /// The rule's actions when matched, empty otherwise.
    pub actions: Vec<RuleAction>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub evaluated_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    pub(crate) fn make_rule(id: &str) -> Rule {
        Rule {
            id: RuleId(id.to_string()),
            name: format!("rule {id}"),
            rule_type: RuleType::Blacklist,
            description: String::new(),
            priority: 100,
            enabled: true,
            conditions: vec![RuleCondition {
                field: "client_id".to_string(),
                operator: ConditionOperator::Equals,
                value: Value::String("c1".to_string()),
            }],
            actions: vec![RuleAction {
                kind: ActionType::Deny,
                parameters: HashMap::new(),
            }],
            tags: Vec::new(),
            created_at: UNIX_EPOCH,
            updated_at: UNIX_EPOCH,
        }
    }

    #[test]
    fn validate_ok() {
        assert!(make_rule("r1").validate().is_ok());
    }

    #[test]
    fn validate_rejects_malformed_id() {
        let mut rule = make_rule("r1");
        rule.id = RuleId("bad id".to_string());
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("unsupported characters"));
    }

    #[test]
    fn validate_empty_name() {
        let mut rule = make_rule("r1");
        rule.name = String::new();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_no_conditions() {
        let mut rule = make_rule("r1");
        rule.conditions.clear();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_no_actions() {
        let mut rule = make_rule("r1");
        rule.actions.clear();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_empty_condition_field() {
        let mut rule = make_rule("r1");
        rule.conditions[0].field = String::new();
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("field is required"));
    }

    #[test]
    fn blocking_action_types() {
        assert!(ActionType::Deny.is_blocking());
        assert!(ActionType::Block.is_blocking());
        assert!(!ActionType::Allow.is_blocking());
        assert!(!ActionType::RateLimit.is_blocking());
        assert!(!ActionType::Throttle.is_blocking());
        assert!(!ActionType::Log.is_blocking());
        assert!(!ActionType::Alert.is_blocking());
    }

    #[test]
    fn operator_serde_snake_case() {
        let op: ConditionOperator = serde_json::from_str("\"starts_with\"").unwrap();
        assert_eq!(op, ConditionOperator::StartsWith);
        assert_eq!(
            serde_json::to_string(&ConditionOperator::NotIn).unwrap(),
            "\"not_in\""
        );
    }

    #[test]
    fn unknown_operator_rejected() {
        let parsed: Result<ConditionOperator, _> = serde_json::from_str("\"regex\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_action_type_rejected() {
        let parsed: Result<ActionType, _> = serde_json::from_str("\"nuke\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn rule_serde_round_trip() {
        let rule = make_rule("r1");
        let json = serde_json::to_string(&rule).unwrap();
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
        assert!(json.contains("\"type\":\"blacklist\""));
    }
}
