use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::rules::entity::{Rule, RuleType};

/// Store for security rules consumed by the rule engine.
///
/// Iteration yields snapshots, never live views, so callers may hold the
/// results across their own locking.
pub trait SecurityRuleStore: Send + Sync {
    /// All enabled rules, in a stable store order. Priority ordering is the
    /// engine's concern, not the store's.
    fn get_active_rules(&self) -> Result<Vec<Rule>, DomainError>;

    /// All rules of one type, enabled or not.
    fn get_rules_by_type(&self, rule_type: RuleType) -> Result<Vec<Rule>, DomainError>;

    /// All rules carrying at least one of the given tags.
    fn get_rules_by_tags(&self, tags: &[String]) -> Result<Vec<Rule>, DomainError>;

    /// Insert or overwrite a rule by id.
    fn save_rule(&self, rule: Rule) -> Result<(), DomainError>;

    /// Replace an existing rule; fails with `NotFound` if the id is absent.
    fn update_rule(&self, rule: Rule) -> Result<(), DomainError>;

    /// Remove a rule; fails with `NotFound` if the id is absent.
    fn delete_rule(&self, id: &RuleId) -> Result<(), DomainError>;

    fn get_rule_by_id(&self, id: &RuleId) -> Result<Rule, DomainError>;
}
