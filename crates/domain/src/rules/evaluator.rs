use std::collections::HashMap;
use std::time::UNIX_EPOCH;

use serde_json::Value;

use super::entity::{
    ConditionOperator, Rule, RuleCondition, RuleEvaluationContext, RuleEvaluationResult,
};

impl Rule {
    /// Evaluate this rule against a request context.
    ///
    /// Disabled rules never match. Conditions form a short-circuit
    /// conjunction; on a full match the result carries the rule's actions,
    /// otherwise it carries none.
    pub fn evaluate(&self, ctx: &RuleEvaluationContext) -> RuleEvaluationResult {
        let mut result = RuleEvaluationResult {
            rule_id: self.id.clone(),
            rule_name: self.name.clone(),
            matched: false,
            actions: Vec::new(),
            metadata: HashMap::new(),
            evaluated_at: ctx.timestamp,
        };

        if !self.enabled {
            return result;
        }

        let matched = self
            .conditions
            .iter()
            .all(|condition| eval_condition(condition, ctx));

        result.matched = matched;
        if matched {
            result.actions = self.actions.clone();
        }
        result
    }
}

/// Evaluate a single condition. Missing fields and type mismatches make the
/// condition false; every operator is total.
fn eval_condition(condition: &RuleCondition, ctx: &RuleEvaluationContext) -> bool {
    let Some(field) = resolve_field(&condition.field, ctx) else {
        return false;
    };

    match condition.operator {
        ConditionOperator::Equals => field == condition.value,
        ConditionOperator::NotEquals => field != condition.value,
        ConditionOperator::Contains => {
            str_operands(&field, &condition.value).is_some_and(|(s, sub)| s.contains(sub))
        }
        ConditionOperator::StartsWith => {
            str_operands(&field, &condition.value).is_some_and(|(s, prefix)| s.starts_with(prefix))
        }
        ConditionOperator::EndsWith => {
            str_operands(&field, &condition.value).is_some_and(|(s, suffix)| s.ends_with(suffix))
        }
        ConditionOperator::In => condition
            .value
            .as_array()
            .is_some_and(|candidates| candidates.contains(&field)),
        ConditionOperator::NotIn => condition
            .value
            .as_array()
            .is_some_and(|candidates| !candidates.contains(&field)),
        ConditionOperator::GreaterThan => {
            num_operands(&field, &condition.value).is_some_and(|(a, b)| a > b)
        }
        ConditionOperator::LessThan => {
            num_operands(&field, &condition.value).is_some_and(|(a, b)| a < b)
        }
        ConditionOperator::GreaterEqual => {
            num_operands(&field, &condition.value).is_some_and(|(a, b)| a >= b)
        }
        ConditionOperator::LessEqual => {
            num_operands(&field, &condition.value).is_some_and(|(a, b)| a <= b)
        }
    }
}

/// Resolve a condition field against the context. Fixed fields come from the
/// context struct; anything else is looked up in `metadata` first, then in
/// `request_data`.
fn resolve_field(field: &str, ctx: &RuleEvaluationContext) -> Option<Value> {
    match field {
        "client_id" => Some(Value::String(ctx.client_id.clone())),
        "resource" => Some(Value::String(ctx.resource.clone())),
        "ip_address" => Some(Value::String(ctx.ip_address.clone())),
        "user_agent" => Some(Value::String(ctx.user_agent.clone())),
        "timestamp" => {
            // Unix seconds, so numeric operators work on it.
            let secs = ctx
                .timestamp
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            Some(Value::from(secs))
        }
        other => {
            if let Some(value) = ctx.metadata.get(other) {
                Some(Value::String(value.clone()))
            } else {
                ctx.request_data.get(other).cloned()
            }
        }
    }
}

fn str_operands<'a>(field: &'a Value, value: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((field.as_str()?, value.as_str()?))
}

fn num_operands(field: &Value, value: &Value) -> Option<(f64, f64)> {
    Some((field.as_f64()?, value.as_f64()?))
}
