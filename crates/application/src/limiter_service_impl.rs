use std::sync::Arc;
use std::time::{Duration, SystemTime};

use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::ratelimit::entity::Algorithm;
use domain::ratelimit::status::{ClientStats, RateLimitHistory, RateLimitStatus, retry_after};
use ports::secondary::clock::Clock;

use crate::command::{Command, CommandHandler, CommandOutcome};
use crate::query::{Query, QueryHandler, QueryResult};

/// Facade over the command and query handlers: the rate-limit engine as one
/// object.
pub struct RateLimiterService {
    commands: CommandHandler,
    queries: QueryHandler,
    clock: Arc<dyn Clock>,
}

impl RateLimiterService {
    pub fn new(commands: CommandHandler, queries: QueryHandler, clock: Arc<dyn Clock>) -> Self {
        Self {
            commands,
            queries,
            clock,
        }
    }

    /// Admit or refuse one request, advancing the counter.
    ///
    /// A client already blocked past `now` is refused from the read model
    /// alone; no command is issued, so refused requests never advance the
    /// counter. Otherwise the decision comes from the freshly persisted
    /// event, which cannot race the asynchronous projection.
    pub fn check_rate_limit(
        &self,
        client_id: &str,
        resource: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<RateLimitStatus, DomainError> {
        let now = self.clock.now();
        let mut current = self.status(client_id, resource)?;
        if current.is_blocked
            && let Some(until) = current.blocked_until
            && now < until
        {
            current.is_allowed = false;
            current.retry_after_secs = retry_after(until, now);
            return Ok(current);
        }

        let outcome = self.commands.handle(Command::ApplyRateLimit {
            client_id: client_id.to_string(),
            resource: resource.to_string(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
        })?;

        match outcome {
            CommandOutcome::EventPersisted(event) => Ok(RateLimitStatus::from_event(&event, now)),
            CommandOutcome::RuleStored(_) => Err(DomainError::Internal(
                "apply rate limit produced no event".to_string(),
            )),
        }
    }

    pub fn status(&self, client_id: &str, resource: &str) -> Result<RateLimitStatus, DomainError> {
        match self.queries.handle(Query::GetRateLimitStatus {
            client_id: client_id.to_string(),
            resource: resource.to_string(),
        })? {
            QueryResult::Status(status) => Ok(status),
            _ => Err(DomainError::Internal("unexpected query result".to_string())),
        }
    }

    pub fn history(
        &self,
        client_id: &str,
        resource: &str,
        start_time: SystemTime,
        end_time: SystemTime,
        limit: usize,
        offset: usize,
    ) -> Result<RateLimitHistory, DomainError> {
        match self.queries.handle(Query::GetRateLimitHistory {
            client_id: client_id.to_string(),
            resource: resource.to_string(),
            start_time,
            end_time,
            limit,
            offset,
        })? {
            QueryResult::History(history) => Ok(history),
            _ => Err(DomainError::Internal("unexpected query result".to_string())),
        }
    }

    pub fn client_stats(
        &self,
        client_id: &str,
        start_time: SystemTime,
        end_time: SystemTime,
    ) -> Result<ClientStats, DomainError> {
        match self.queries.handle(Query::GetClientStats {
            client_id: client_id.to_string(),
            start_time,
            end_time,
        })? {
            QueryResult::Stats(stats) => Ok(stats),
            _ => Err(DomainError::Internal("unexpected query result".to_string())),
        }
    }

    pub fn active_rules(
        &self,
        resource: Option<&str>,
    ) -> Result<Vec<domain::ratelimit::entity::RateLimitRule>, DomainError> {
        match self.queries.handle(Query::GetActiveRules {
            resource: resource.map(str::to_string),
        })? {
            QueryResult::ActiveRules(rules) => Ok(rules),
            _ => Err(DomainError::Internal("unexpected query result".to_string())),
        }
    }

    pub fn create_rule(
        &self,
        resource: &str,
        limit: u32,
        window: Duration,
        algorithm: Algorithm,
    ) -> Result<RuleId, DomainError> {
        match self.commands.handle(Command::CreateRule {
            resource: resource.to_string(),
            limit,
            window,
            algorithm,
        })? {
            CommandOutcome::RuleStored(rule) => Ok(rule.id),
            CommandOutcome::EventPersisted(_) => {
                Err(DomainError::Internal("create rule produced an event".to_string()))
            }
        }
    }

    pub fn update_rule(
        &self,
        rule_id: &RuleId,
        resource: &str,
        limit: u32,
        window: Duration,
        algorithm: Algorithm,
    ) -> Result<(), DomainError> {
        self.commands
            .handle(Command::UpdateRule {
                rule_id: rule_id.clone(),
                resource: resource.to_string(),
                limit,
                window,
                algorithm,
            })
            .map(|_| ())
    }

    pub fn reset(&self, client_id: &str, resource: &str) -> Result<(), DomainError> {
        self.commands
            .handle(Command::ResetRateLimit {
                client_id: client_id.to_string(),
                resource: resource.to_string(),
            })
            .map(|_| ())
    }
}
