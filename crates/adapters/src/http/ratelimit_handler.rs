use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use domain::ratelimit::entity::Algorithm;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::dto::{ClientStatsDto, HistoryDto, RateLimitRuleDto, RateLimitStatusDto};
use super::error::{ApiError, ErrorBody};
use super::state::AppState;
use super::validation::{
    MAX_ID_LENGTH, MAX_SHORT_STRING_LENGTH, validate_required, validate_string_length,
};

// ── Request DTOs ────────────────────────────────────────────────────

#[derive(Deserialize, ToSchema)]
pub struct CreateRuleRequest {
    pub resource: String,
    pub limit: u32,
    /// Human duration such as `"30s"`, `"5m"`, `"1h 30m"`.
    pub window: String,
    #[serde(default)]
    pub algorithm: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetRequest {
    pub client_id: String,
    pub resource: String,
}

#[derive(Deserialize, IntoParams)]
pub struct RulesQuery {
    pub resource: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct StatusQuery {
    pub client_id: String,
    pub resource: String,
}

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    pub client_id: String,
    pub resource: String,
    /// Unix seconds, exclusive lower bound. Defaults to the epoch.
    pub start: Option<u64>,
    /// Unix seconds, exclusive upper bound. Defaults to one hour from now.
    pub end: Option<u64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize, IntoParams)]
pub struct StatsQuery {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

// ── Handlers ────────────────────────────────────────────────────────

/// `POST /api/v1/ratelimit/rules` — create a rate-limit rule.
#[utoipa::path(
    post, path = "/api/v1/ratelimit/rules",
    tag = "Rate Limiting",
    request_body = CreateRuleRequest,
    responses(
        (status = 201, description = "Rule created"),
        (status = 400, description = "Validation error", body = ErrorBody),
    )
)]
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required("resource", &req.resource)?;
    validate_string_length("resource", &req.resource, MAX_ID_LENGTH)?;
    let window = parse_window(&req.window)?;
    let algorithm = parse_algorithm(req.algorithm.as_deref())?;

    let id = state
        .admission
        .limiter()
        .create_rule(&req.resource, req.limit, window, algorithm)?;

    tracing::info!(rule_id = %id, resource = %req.resource, "rate limit rule created via API");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id.0 })),
    ))
}

/// `GET /api/v1/ratelimit/rules` — list rules for a resource.
#[utoipa::path(
    get, path = "/api/v1/ratelimit/rules",
    tag = "Rate Limiting",
    params(RulesQuery),
    responses((status = 200, description = "Configured rules", body = Vec<RateLimitRuleDto>))
)]
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RulesQuery>,
) -> Result<Json<Vec<RateLimitRuleDto>>, ApiError> {
    let rules = state
        .admission
        .limiter()
        .active_rules(query.resource.as_deref())?;
    Ok(Json(rules.iter().map(RateLimitRuleDto::from_domain).collect()))
}

/// `GET /api/v1/ratelimit/status` — current status for a key.
#[utoipa::path(
    get, path = "/api/v1/ratelimit/status",
    tag = "Rate Limiting",
    params(StatusQuery),
    responses((status = 200, description = "Current status", body = RateLimitStatusDto))
)]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<RateLimitStatusDto>, ApiError> {
    validate_required("client_id", &query.client_id)?;
    validate_required("resource", &query.resource)?;
    let status = state
        .admission
        .limiter()
        .status(&query.client_id, &query.resource)?;
    Ok(Json(RateLimitStatusDto::from_domain(&status)))
}

/// `GET /api/v1/ratelimit/history` — paginated event history for a key.
#[utoipa::path(
    get, path = "/api/v1/ratelimit/history",
    tag = "Rate Limiting",
    params(HistoryQuery),
    responses((status = 200, description = "History page", body = HistoryDto))
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryDto>, ApiError> {
    validate_required("client_id", &query.client_id)?;
    validate_required("resource", &query.resource)?;

    let start = unix_time(query.start.unwrap_or(0));
    let end = match query.end {
        Some(end) => unix_time(end),
        None => state.clock.now() + Duration::from_secs(3600),
    };

    let history = state.admission.limiter().history(
        &query.client_id,
        &query.resource,
        start,
        end,
        query.limit.unwrap_or(100),
        query.offset.unwrap_or(0),
    )?;
    Ok(Json(HistoryDto::from_domain(&history)))
}

/// `GET /api/v1/clients/{client_id}/stats` — per-client statistics.
#[utoipa::path(
    get, path = "/api/v1/clients/{client_id}/stats",
    tag = "Rate Limiting",
    params(
        ("client_id" = String, Path, description = "Client identifier"),
        StatsQuery,
    ),
    responses((status = 200, description = "Client statistics", body = ClientStatsDto))
)]
pub async fn get_client_stats(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ClientStatsDto>, ApiError> {
    validate_required("client_id", &client_id)?;

    let now = state.clock.now();
    let start = unix_time(query.start.unwrap_or(0));
    let end = match query.end {
        Some(end) => unix_time(end),
        None => now,
    };

    let stats = state
        .admission
        .limiter()
        .client_stats(&client_id, start, end)?;
    Ok(Json(ClientStatsDto::from_domain(&stats)))
}

/// `POST /api/v1/ratelimit/reset` — reset the counter for a key.
#[utoipa::path(
    post, path = "/api/v1/ratelimit/reset",
    tag = "Rate Limiting",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Counter reset"),
        (status = 400, description = "Validation error", body = ErrorBody),
    )
)]
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required("client_id", &req.client_id)?;
    validate_required("resource", &req.resource)?;

    state
        .admission
        .limiter()
        .reset(&req.client_id, &req.resource)?;

    tracing::info!(
        client_id = %req.client_id,
        resource = %req.resource,
        "rate limit reset via API"
    );
    Ok(Json(serde_json::json!({ "status": "reset" })))
}

// ── Request parsing ─────────────────────────────────────────────────

/// Unix seconds to `SystemTime`, saturating far in the future instead of
/// overflowing on absurd inputs.
fn unix_time(secs: u64) -> std::time::SystemTime {
    std::time::UNIX_EPOCH
        .checked_add(Duration::from_secs(secs))
        .unwrap_or_else(|| std::time::UNIX_EPOCH + Duration::from_secs(u64::from(u32::MAX)))
}

pub(super) fn parse_window(raw: &str) -> Result<Duration, ApiError> {
    let window = humantime::parse_duration(raw)
        .map_err(|e| ApiError::bad_request(format!("invalid window '{raw}': {e}")))?;
    if window.is_zero() {
        return Err(ApiError::bad_request("window must be positive"));
    }
    Ok(window)
}

pub(super) fn parse_algorithm(raw: Option<&str>) -> Result<Algorithm, ApiError> {
    let Some(raw) = raw else {
        return Ok(Algorithm::SlidingWindow);
    };
    validate_string_length("algorithm", raw, MAX_SHORT_STRING_LENGTH)?;
    match raw.to_lowercase().as_str() {
        "token_bucket" | "tokenbucket" => Ok(Algorithm::TokenBucket),
        "fixed_window" | "fixedwindow" => Ok(Algorithm::FixedWindow),
        "sliding_window" | "slidingwindow" => Ok(Algorithm::SlidingWindow),
        "leaky_bucket" | "leakybucket" => Ok(Algorithm::LeakyBucket),
        other => Err(ApiError::bad_request(format!(
            "invalid algorithm '{other}': expected token_bucket, fixed_window, sliding_window, or leaky_bucket"
        ))),
    }
}
