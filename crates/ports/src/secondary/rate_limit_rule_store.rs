use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::ratelimit::entity::RateLimitRule;

/// Store for engine-configured rate-limit rules, with a secondary index
/// on `resource`.
pub trait RateLimitRuleStore: Send + Sync {
    /// Insert or overwrite a rule by id.
    fn save(&self, rule: RateLimitRule) -> Result<(), DomainError>;

    /// All rules configured for a resource, in a stable order.
    fn get_by_resource(&self, resource: &str) -> Result<Vec<RateLimitRule>, DomainError>;

    fn get_by_id(&self, id: &RuleId) -> Result<RateLimitRule, DomainError>;

    /// Replace an existing rule; fails with `NotFound` if the id is absent.
    fn update(&self, rule: RateLimitRule) -> Result<(), DomainError>;

    /// Remove a rule; fails with `NotFound` if the id is absent.
    fn delete(&self, id: &RuleId) -> Result<(), DomainError>;
}
