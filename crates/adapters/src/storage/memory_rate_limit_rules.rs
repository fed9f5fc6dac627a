use std::collections::HashMap;
use std::sync::RwLock;

use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::ratelimit::entity::RateLimitRule;
use ports::secondary::rate_limit_rule_store::RateLimitRuleStore;

/// In-memory rate-limit rule store keyed by rule id, with resource lookups
/// answered from a snapshot sorted by id for deterministic iteration.
#[derive(Default)]
pub struct InMemoryRateLimitRuleStore {
    rules: RwLock<HashMap<String, RateLimitRule>>,
}

impl InMemoryRateLimitRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked_err() -> DomainError {
        DomainError::Internal("rate limit rule store lock poisoned".to_string())
    }
}

impl RateLimitRuleStore for InMemoryRateLimitRuleStore {
    fn save(&self, rule: RateLimitRule) -> Result<(), DomainError> {
        let mut rules = self.rules.write().map_err(|_| Self::locked_err())?;
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }

    fn get_by_resource(&self, resource: &str) -> Result<Vec<RateLimitRule>, DomainError> {
        let rules = self.rules.read().map_err(|_| Self::locked_err())?;
        let mut matching: Vec<RateLimitRule> = rules
            .values()
            .filter(|rule| rule.resource == resource)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(matching)
    }

    fn get_by_id(&self, id: &RuleId) -> Result<RateLimitRule, DomainError> {
        let rules = self.rules.read().map_err(|_| Self::locked_err())?;
        rules
            .get(&id.0)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("rate limit rule {id}")))
    }

    fn update(&self, rule: RateLimitRule) -> Result<(), DomainError> {
        let mut rules = self.rules.write().map_err(|_| Self::locked_err())?;
        if !rules.contains_key(&rule.id.0) {
            return Err(DomainError::NotFound(format!("rate limit rule {}", rule.id)));
        }
        rules.insert(rule.id.0.clone(), rule);
        Ok(())
    }

    fn delete(&self, id: &RuleId) -> Result<(), DomainError> {
        let mut rules = self.rules.write().map_err(|_| Self::locked_err())?;
        rules
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("rate limit rule {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::ratelimit::entity::Algorithm;
    use std::time::{Duration, UNIX_EPOCH};

    fn make_rule(id: &str, resource: &str, limit: u32) -> RateLimitRule {
        RateLimitRule {
            id: RuleId(id.to_string()),
            resource: resource.to_string(),
            limit,
            window: Duration::from_secs(60),
            algorithm: Algorithm::default(),
            created_at: UNIX_EPOCH,
            updated_at: UNIX_EPOCH,
        }
    }

    #[test]
    fn save_then_load_by_id_round_trips() {
        let store = InMemoryRateLimitRuleStore::new();
        let rule = make_rule("rl-001", "api", 100);
        store.save(rule.clone()).unwrap();
        assert_eq!(store.get_by_id(&rule.id).unwrap(), rule);
    }

    #[test]
    fn save_overwrites_by_id() {
        let store = InMemoryRateLimitRuleStore::new();
        store.save(make_rule("rl-001", "api", 100)).unwrap();
        store.save(make_rule("rl-001", "api", 50)).unwrap();
        assert_eq!(store.get_by_id(&RuleId("rl-001".to_string())).unwrap().limit, 50);
        assert_eq!(store.get_by_resource("api").unwrap().len(), 1);
    }

    #[test]
    fn resource_lookup_is_sorted_by_id() {
        let store = InMemoryRateLimitRuleStore::new();
        store.save(make_rule("rl-b", "api", 10)).unwrap();
        store.save(make_rule("rl-a", "api", 20)).unwrap();
        store.save(make_rule("rl-c", "login", 5)).unwrap();

        let api_rules = store.get_by_resource("api").unwrap();
        assert_eq!(api_rules.len(), 2);
        assert_eq!(api_rules[0].id.0, "rl-a");
        assert_eq!(api_rules[1].id.0, "rl-b");
        assert!(store.get_by_resource("upload").unwrap().is_empty());
    }

    #[test]
    fn update_missing_rule_fails() {
        let store = InMemoryRateLimitRuleStore::new();
        let err = store.update(make_rule("ghost", "api", 1)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn delete_missing_rule_fails() {
        let store = InMemoryRateLimitRuleStore::new();
        assert!(store.delete(&RuleId("ghost".to_string())).is_err());

        store.save(make_rule("rl-001", "api", 100)).unwrap();
        store.delete(&RuleId("rl-001".to_string())).unwrap();
        assert!(store.get_by_id(&RuleId("rl-001".to_string())).is_err());
    }
}
