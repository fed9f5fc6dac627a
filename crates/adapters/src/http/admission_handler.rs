use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::dto::{RateLimitStatusDto, RuleResultDto};
use super::error::{ApiError, ErrorBody};
use super::state::AppState;
use super::validation::{
    MAX_ID_LENGTH, MAX_USER_AGENT_LENGTH, validate_required, validate_string_length,
};

#[derive(Deserialize, ToSchema)]
pub struct CheckRequest {
    pub client_id: String,
    pub resource: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub request_data: Option<HashMap<String, Value>>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckResponse {
    pub allowed: bool,
    pub reason: String,
    pub rule_results: Vec<RuleResultDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_status: Option<RateLimitStatusDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_rule_id: Option<String>,
}

/// `POST /api/v1/check` — run one request through the admission pipeline.
///
/// Denials answer `429` and, when a rate-limit decision is present, carry
/// `x-ratelimit-*` quota headers plus `retry-after` on denial.
#[utoipa::path(
    post, path = "/api/v1/check",
    tag = "Admission",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Request admitted", body = CheckResponse),
        (status = 429, description = "Request denied", body = CheckResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
    )
)]
pub async fn check_request(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required("client_id", &req.client_id)?;
    validate_required("resource", &req.resource)?;
    validate_string_length("client_id", &req.client_id, MAX_ID_LENGTH)?;
    validate_string_length("resource", &req.resource, MAX_ID_LENGTH)?;
    let ip_address = req.ip_address.unwrap_or_default();
    let user_agent = req.user_agent.unwrap_or_default();
    validate_string_length("user_agent", &user_agent, MAX_USER_AGENT_LENGTH)?;

    let decision = state.admission.check_request_with_rules(
        &req.client_id,
        &req.resource,
        &ip_address,
        &user_agent,
        req.metadata.unwrap_or_default(),
        req.request_data.unwrap_or_default(),
    )?;

    let status_code = if decision.allowed {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };

    let mut headers = HeaderMap::new();
    if let Some(ref status) = decision.rate_limit_status {
        insert_numeric(&mut headers, "x-ratelimit-limit", u64::from(status.limit));
        insert_numeric(
            &mut headers,
            "x-ratelimit-remaining",
            u64::from(status.remaining_quota),
        );
        insert_numeric(
            &mut headers,
            "x-ratelimit-reset",
            super::dto::unix_secs(status.reset_time),
        );
        if !decision.allowed {
            insert_numeric(&mut headers, "retry-after", status.retry_after_secs);
        }
    }

    let body = CheckResponse {
        allowed: decision.allowed,
        reason: decision.reason,
        rule_results: decision
            .rule_results
            .iter()
            .map(RuleResultDto::from_domain)
            .collect(),
        rate_limit_status: decision
            .rate_limit_status
            .as_ref()
            .map(RateLimitStatusDto::from_domain),
        blocking_rule_id: decision.blocking_rule_id.map(|id| id.0),
    };

    Ok((status_code, headers, Json(body)))
}

fn insert_numeric(headers: &mut HeaderMap, name: &'static str, value: u64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}
