//! Wire representations: times as unix seconds, enums as their
//! snake_case names.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use domain::ratelimit::entity::RateLimitRule;
use domain::ratelimit::status::{
    ClientStats, HistoryRecord, RateLimitHistory, RateLimitStatus, ResourceStats, TimeSeriesPoint,
};
use domain::rules::entity::{RuleAction, RuleEvaluationResult};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

pub fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[derive(Serialize, ToSchema)]
pub struct RateLimitStatusDto {
    pub client_id: String,
    pub resource: String,
    pub is_allowed: bool,
    pub request_count: u32,
    pub limit: u32,
    pub remaining_quota: u32,
    pub window_start: u64,
    pub window_end: u64,
    pub reset_time: u64,
    pub is_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<u64>,
    pub retry_after_secs: u64,
}

impl RateLimitStatusDto {
    pub fn from_domain(status: &RateLimitStatus) -> Self {
        Self {
            client_id: status.client_id.clone(),
            resource: status.resource.clone(),
            is_allowed: status.is_allowed,
            request_count: status.request_count,
            limit: status.limit,
            remaining_quota: status.remaining_quota,
            window_start: unix_secs(status.window_start),
            window_end: unix_secs(status.window_end),
            reset_time: unix_secs(status.reset_time),
            is_blocked: status.is_blocked,
            blocked_until: status.blocked_until.map(unix_secs),
            retry_after_secs: status.retry_after_secs,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RuleActionDto {
    #[serde(rename = "type")]
    pub kind: String,
    #[schema(value_type = Object)]
    pub parameters: HashMap<String, Value>,
}

#[derive(Serialize, ToSchema)]
pub struct RuleResultDto {
    pub rule_id: String,
    pub rule_name: String,
    pub matched: bool,
    pub actions: Vec<RuleActionDto>,
    pub evaluated_at: u64,
}

impl RuleResultDto {
    pub fn from_domain(result: &RuleEvaluationResult) -> Self {
        Self {
            rule_id: result.rule_id.0.clone(),
            rule_name: result.rule_name.clone(),
            matched: result.matched,
            actions: result.actions.iter().map(action_dto).collect(),
            evaluated_at: unix_secs(result.evaluated_at),
        }
    }
}

fn action_dto(action: &RuleAction) -> RuleActionDto {
    let kind = serde_json::to_value(action.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    RuleActionDto {
        kind,
        parameters: action.parameters.clone(),
    }
}

#[derive(Serialize, ToSchema)]
pub struct RateLimitRuleDto {
    pub id: String,
    pub resource: String,
    pub limit: u32,
    pub window: String,
    pub algorithm: String,
    pub created_at: u64,
    pub updated_at: u64,
}

impl RateLimitRuleDto {
    pub fn from_domain(rule: &RateLimitRule) -> Self {
        Self {
            id: rule.id.0.clone(),
            resource: rule.resource.clone(),
            limit: rule.limit,
            window: humantime::format_duration(rule.window).to_string(),
            algorithm: rule.algorithm.as_str().to_string(),
            created_at: unix_secs(rule.created_at),
            updated_at: unix_secs(rule.updated_at),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryRecordDto {
    pub event_id: String,
    pub event_type: String,
    pub client_id: String,
    pub resource: String,
    pub timestamp: u64,
    pub request_count: u32,
    pub limit: u32,
    pub is_blocked: bool,
}

impl HistoryRecordDto {
    pub fn from_domain(record: &HistoryRecord) -> Self {
        Self {
            event_id: record.event_id.clone(),
            event_type: record.event_type.clone(),
            client_id: record.client_id.clone(),
            resource: record.resource.clone(),
            timestamp: unix_secs(record.timestamp),
            request_count: record.request_count,
            limit: record.limit,
            is_blocked: record.is_blocked,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryDto {
    pub events: Vec<HistoryRecordDto>,
    pub total_count: usize,
    pub has_more: bool,
}

impl HistoryDto {
    pub fn from_domain(history: &RateLimitHistory) -> Self {
        Self {
            events: history
                .records
                .iter()
                .map(HistoryRecordDto::from_domain)
                .collect(),
            total_count: history.total_count,
            has_more: history.has_more,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ResourceStatsDto {
    pub resource: String,
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub allowed_requests: u64,
    pub blocked_rate: f64,
}

#[derive(Serialize, ToSchema)]
pub struct TimeSeriesPointDto {
    pub timestamp: u64,
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub allowed_requests: u64,
}

#[derive(Serialize, ToSchema)]
pub struct ClientStatsDto {
    pub client_id: String,
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub allowed_requests: u64,
    pub resource_stats: Vec<ResourceStatsDto>,
    pub time_series: Vec<TimeSeriesPointDto>,
}

impl ClientStatsDto {
    pub fn from_domain(stats: &ClientStats) -> Self {
        Self {
            client_id: stats.client_id.clone(),
            total_requests: stats.total_requests,
            blocked_requests: stats.blocked_requests,
            allowed_requests: stats.allowed_requests,
            resource_stats: stats.resource_stats.iter().map(resource_dto).collect(),
            time_series: stats.time_series.iter().map(point_dto).collect(),
        }
    }
}

fn resource_dto(stats: &ResourceStats) -> ResourceStatsDto {
    ResourceStatsDto {
        resource: stats.resource.clone(),
        total_requests: stats.total_requests,
        blocked_requests: stats.blocked_requests,
        allowed_requests: stats.allowed_requests,
        blocked_rate: stats.blocked_rate,
    }
}

fn point_dto(point: &TimeSeriesPoint) -> TimeSeriesPointDto {
    TimeSeriesPointDto {
        timestamp: unix_secs(point.timestamp),
        total_requests: point.total_requests,
        blocked_requests: point.blocked_requests,
        allowed_requests: point.allowed_requests,
    }
}
