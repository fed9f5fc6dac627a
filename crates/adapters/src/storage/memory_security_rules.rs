use std::collections::HashMap;
use std::sync::RwLock;

use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::rules::entity::{Rule, RuleType};
use ports::secondary::security_rule_store::SecurityRuleStore;

/// In-memory security rule store keyed by rule id.
///
/// Lookups return snapshots sorted by id; priority ordering is the rule
/// engine's concern.
#[derive(Default)]
pub struct InMemorySecurityRuleStore {
    rules: RwLock<HashMap<String, Rule>>,
}

impl InMemorySecurityRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked_err() -> DomainError {
        DomainError::Internal("security rule store lock poisoned".to_string())
    }

    fn snapshot_where(
        &self,
        keep: impl Fn(&Rule) -> bool,
    ) -> Result<Vec<Rule>, DomainError> {
        let rules = self.rules.read().map_err(|_| Self::locked_err())?;
        let mut matching: Vec<Rule> = rules.values().filter(|r| keep(r)).cloned().collect();
        matching.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(matching)
    }
}

impl SecurityRuleStore for InMemorySecurityRuleStore {
    fn get_active_rules(&self) -> Result<Vec<Rule>, DomainError> {
        self.snapshot_where(|rule| rule.enabled)
    }

    fn get_rules_by_type(&self, rule_type: RuleType) -> Result<Vec<Rule>, DomainError> {
        self.snapshot_where(|rule| rule.rule_type == rule_type)
    }

    fn get_rules_by_tags(&self, tags: &[String]) -> Result<Vec<Rule>, DomainError> {
        self.snapshot_where(|rule| rule.tags.iter().any(|tag| tags.contains(tag)))
    }

    fn save_rule(&self, rule: Rule) -> Result<(), DomainError> {
        let mut rules = self.rules.write().map_err(|_| Self::locked_err())?;
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }

    fn update_rule(&self, rule: Rule) -> Result<(), DomainError> {
        let mut rules = self.rules.write().map_err(|_| Self::locked_err())?;
        if !rules.contains_key(&rule.id.0) {
            return Err(DomainError::NotFound(format!("security rule {}", rule.id)));
        }
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }

    fn delete_rule(&self, id: &RuleId) -> Result<(), DomainError> {
        let mut rules = self.rules.write().map_err(|_| Self::locked_err())?;
        rules
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("security rule {id}")))
    }

    fn get_rule_by_id(&self, id: &RuleId) -> Result<Rule, DomainError> {
        let rules = self.rules.read().map_err(|_| Self::locked_err())?;
        rules
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("security rule {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::rules::entity::{ActionType, ConditionOperator, RuleAction, RuleCondition};
    use serde_json::json;
    use std::time::UNIX_EPOCH;

    fn make_rule(id: &str, rule_type: RuleType, enabled: bool, tags: &[&str]) -> Rule {
        Rule {
            id: RuleId(id.to_string()),
            name: format!("rule {id}"),
            rule_type,
            description: String::new(),
            priority: 100,
            enabled,
            conditions: vec![RuleCondition {
                field: "resource".to_string(),
                operator: ConditionOperator::Equals,
                value: json!("api"),
            }],
            actions: vec![RuleAction {
                kind: ActionType::Deny,
                parameters: HashMap::new(),
            }],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: UNIX_EPOCH,
            updated_at: UNIX_EPOCH,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = InMemorySecurityRuleStore::new();
        let rule = make_rule("r1", RuleType::Blacklist, true, &["security"]);
        store.save_rule(rule.clone()).unwrap();
        assert_eq!(store.get_rule_by_id(&rule.id).unwrap(), rule);
    }

    #[test]
    fn active_rules_excludes_disabled() {
        let store = InMemorySecurityRuleStore::new();
        store
            .save_rule(make_rule("on", RuleType::Blacklist, true, &[]))
            .unwrap();
        store
            .save_rule(make_rule("off", RuleType::Blacklist, false, &[]))
            .unwrap();

        let active = store.get_active_rules().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.0, "on");
    }

    #[test]
    fn disabled_rules_are_retained() {
        let store = InMemorySecurityRuleStore::new();
        store
            .save_rule(make_rule("off", RuleType::Blacklist, false, &[]))
            .unwrap();
        assert!(store.get_rule_by_id(&RuleId("off".to_string())).is_ok());
    }

    #[test]
    fn lookup_by_type_ignores_enabled_flag() {
        let store = InMemorySecurityRuleStore::new();
        store
            .save_rule(make_rule("w", RuleType::Whitelist, false, &[]))
            .unwrap();
        store
            .save_rule(make_rule("b", RuleType::Blacklist, true, &[]))
            .unwrap();

        let whitelists = store.get_rules_by_type(RuleType::Whitelist).unwrap();
        assert_eq!(whitelists.len(), 1);
        assert_eq!(whitelists[0].id.0, "w");
    }

    #[test]
    fn lookup_by_tags_matches_any() {
        let store = InMemorySecurityRuleStore::new();
        store
            .save_rule(make_rule("a", RuleType::Blacklist, true, &["security", "login"]))
            .unwrap();
        store
            .save_rule(make_rule("b", RuleType::Blacklist, true, &["ip-based"]))
            .unwrap();

        let found = store
            .get_rules_by_tags(&["login".to_string(), "other".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.0, "a");
    }

    #[test]
    fn update_and_delete_require_existing() {
        let store = InMemorySecurityRuleStore::new();
        assert!(
            store
                .update_rule(make_rule("ghost", RuleType::Blacklist, true, &[]))
                .is_err()
        );
        assert!(store.delete_rule(&RuleId("ghost".to_string())).is_err());

        store
            .save_rule(make_rule("r1", RuleType::Blacklist, true, &[]))
            .unwrap();
        store.delete_rule(&RuleId("r1".to_string())).unwrap();
        assert!(store.get_rule_by_id(&RuleId("r1".to_string())).is_err());
    }
}
