use std::sync::Arc;

use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::rules::entity::{
    ActionType, Rule, RuleAction, RuleEvaluationContext, RuleEvaluationResult, RuleType,
};
use ports::secondary::event_sink::RuleEventSink;
use ports::secondary::metrics_port::MetricsPort;
use ports::secondary::security_rule_store::SecurityRuleStore;
use uuid::Uuid;

/// Application-level rule engine.
///
/// Loads active rules from the store, evaluates them in priority order, and
/// emits evaluation events. Publish failures never abort evaluation.
pub struct RuleEngineService {
    store: Arc<dyn SecurityRuleStore>,
    events: Arc<dyn RuleEventSink>,
    metrics: Arc<dyn MetricsPort>,
}

impl RuleEngineService {
    pub fn new(
        store: Arc<dyn SecurityRuleStore>,
        events: Arc<dyn RuleEventSink>,
        metrics: Arc<dyn MetricsPort>,
    ) -> Self {
        Self {
            store,
            events,
            metrics,
        }
    }

    /// Evaluate all enabled rules against a context, highest priority first.
    /// Every rule yields a result, matched or not.
    pub fn evaluate_rules(
        &self,
        ctx: &RuleEvaluationContext,
    ) -> Result<Vec<RuleEvaluationResult>, DomainError> {
        let mut rules = self.store.get_active_rules()?;
        sort_by_priority(&mut rules);
        Ok(self.evaluate_all(&rules, ctx))
    }

    /// Evaluate rules of a single type against a context. Disabled rules are
    /// skipped entirely.
    pub fn evaluate_rules_by_type(
        &self,
        rule_type: RuleType,
        ctx: &RuleEvaluationContext,
    ) -> Result<Vec<RuleEvaluationResult>, DomainError> {
        let mut rules = self.store.get_rules_by_type(rule_type)?;
        rules.retain(|rule| rule.enabled);
        sort_by_priority(&mut rules);
        Ok(self.evaluate_all(&rules, ctx))
    }

    fn evaluate_all(
        &self,
        rules: &[Rule],
        ctx: &RuleEvaluationContext,
    ) -> Vec<RuleEvaluationResult> {
        let mut results = Vec::with_capacity(rules.len());
        for rule in rules {
            let result = rule.evaluate(ctx);

            if let Err(err) = self.events.publish_rule_evaluated(&result) {
                tracing::warn!(rule_id = %result.rule_id, error = %err, "rule evaluated publish failed");
            }
            if result.matched
                && let Err(err) = self.events.publish_rule_matched(&result)
            {
                tracing::warn!(rule_id = %result.rule_id, error = %err, "rule matched publish failed");
            }

            results.push(result);
        }
        results
    }

    /// True iff any matched result carries a `deny` or `block` action.
    pub fn has_blocking_action(results: &[RuleEvaluationResult]) -> bool {
        results
            .iter()
            .filter(|result| result.matched)
            .any(|result| result.actions.iter().any(|action| action.kind.is_blocking()))
    }

    /// All matched `rate_limit` actions, in evaluation order.
    pub fn rate_limit_actions(results: &[RuleEvaluationResult]) -> Vec<RuleAction> {
        results
            .iter()
            .filter(|result| result.matched)
            .flat_map(|result| result.actions.iter())
            .filter(|action| action.kind == ActionType::RateLimit)
            .cloned()
            .collect()
    }

    /// Validate and persist a rule; a missing id is generated.
    pub fn create_rule(&self, mut rule: Rule) -> Result<RuleId, DomainError> {
        if rule.id.0.is_empty() {
            rule.id = RuleId(format!("rule-{}", Uuid::new_v4()));
        }
        rule.validate()?;
        let id = rule.id.clone();
        self.store.save_rule(rule)?;
        self.update_rule_metrics();
        Ok(id)
    }

    pub fn update_rule(&self, rule: Rule) -> Result<(), DomainError> {
        rule.validate()?;
        self.store.update_rule(rule)
    }

    pub fn delete_rule(&self, id: &RuleId) -> Result<(), DomainError> {
        self.store.delete_rule(id)?;
        self.update_rule_metrics();
        Ok(())
    }

    pub fn get_rule(&self, id: &RuleId) -> Result<Rule, DomainError> {
        self.store.get_rule_by_id(id)
    }

    pub fn rules_by_tags(&self, tags: &[String]) -> Result<Vec<Rule>, DomainError> {
        self.store.get_rules_by_tags(tags)
    }

    fn update_rule_metrics(&self) {
        if let Ok(active) = self.store.get_active_rules() {
            self.metrics.set_rules_loaded("security", active.len() as u64);
        }
    }
}

/// Stable descending sort: equal priorities keep store order.
fn sort_by_priority(rules: &mut [Rule]) {
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
}
