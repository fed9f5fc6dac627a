use std::sync::Arc;
use std::time::SystemTime;

use domain::common::error::DomainError;
use domain::ratelimit::entity::RateLimitRule;
use domain::ratelimit::status::{ClientStats, RateLimitHistory, RateLimitStatus};
use ports::secondary::rate_limit_rule_store::RateLimitRuleStore;
use ports::secondary::read_model_store::ReadModelStore;

/// The closed set of rate-limiter queries.
#[derive(Debug, Clone)]
pub enum Query {
    GetRateLimitStatus {
        client_id: String,
        resource: String,
    },
    GetRateLimitHistory {
        client_id: String,
        resource: String,
        start_time: SystemTime,
        end_time: SystemTime,
        limit: usize,
        offset: usize,
    },
    GetActiveRules {
        resource: Option<String>,
    },
    GetClientStats {
        client_id: String,
        start_time: SystemTime,
        end_time: SystemTime,
    },
}

#[derive(Debug, Clone)]
pub enum QueryResult {
    Status(RateLimitStatus),
    History(RateLimitHistory),
    ActiveRules(Vec<RateLimitRule>),
    Stats(ClientStats),
}

/// Read-side handler over the projection and the rule store.
pub struct QueryHandler {
    read_model: Arc<dyn ReadModelStore>,
    rules: Arc<dyn RateLimitRuleStore>,
}

impl QueryHandler {
    pub fn new(read_model: Arc<dyn ReadModelStore>, rules: Arc<dyn RateLimitRuleStore>) -> Self {
        Self { read_model, rules }
    }

    pub fn handle(&self, query: Query) -> Result<QueryResult, DomainError> {
        match query {
            Query::GetRateLimitStatus {
                client_id,
                resource,
            } => self
                .read_model
                .get_status(&client_id, &resource)
                .map(QueryResult::Status),
            Query::GetRateLimitHistory {
                client_id,
                resource,
                start_time,
                end_time,
                limit,
                offset,
            } => self
                .read_model
                .get_history(&client_id, &resource, start_time, end_time, limit, offset)
                .map(QueryResult::History),
            Query::GetActiveRules { resource } => match resource {
                Some(resource) => self
                    .rules
                    .get_by_resource(&resource)
                    .map(QueryResult::ActiveRules),
                // Without a resource filter there is nothing to enumerate.
                None => Ok(QueryResult::ActiveRules(Vec::new())),
            },
            Query::GetClientStats {
                client_id,
                start_time,
                end_time,
            } => self
                .read_model
                .get_client_stats(&client_id, start_time, end_time)
                .map(QueryResult::Stats),
        }
    }
}
