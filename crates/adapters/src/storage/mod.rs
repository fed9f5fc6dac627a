pub mod memory_event_store;
pub mod memory_rate_limit_rules;
pub mod memory_read_model;
pub mod memory_security_rules;

pub use memory_event_store::InMemoryEventStore;
pub use memory_rate_limit_rules::InMemoryRateLimitRuleStore;
pub use memory_read_model::InMemoryReadModel;
pub use memory_security_rules::InMemorySecurityRuleStore;
