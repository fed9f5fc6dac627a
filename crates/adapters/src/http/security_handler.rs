use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use domain::common::entity::RuleId;
use domain::rules::entity::{ActionType, Rule, RuleAction, RuleCondition, RuleType};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::error::{ApiError, ErrorBody};
use super::ratelimit_handler::{parse_algorithm, parse_window};
use super::state::AppState;
use super::validation::{MAX_ID_LENGTH, MAX_NAME_LENGTH, validate_required, validate_string_length};

// ── Request DTOs ────────────────────────────────────────────────────

#[derive(Deserialize, ToSchema)]
pub struct BlockIpsRequest {
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RateLimitResourcesRequest {
    pub resources: Vec<String>,
    pub limit: u32,
    /// Human duration such as `"30s"`, `"5m"`, `"1h 30m"`.
    pub window: String,
    #[serde(default)]
    pub algorithm: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ConditionBody {
    pub field: String,
    #[schema(value_type = String)]
    pub operator: domain::rules::entity::ConditionOperator,
    #[schema(value_type = Object)]
    pub value: Value,
}

#[derive(Deserialize, ToSchema)]
pub struct ActionBody {
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: ActionType,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub parameters: HashMap<String, Value>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSecurityRuleRequest {
    pub name: String,
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub rule_type: RuleType,
    #[serde(default)]
    pub description: String,
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub conditions: Vec<ConditionBody>,
    pub actions: Vec<ActionBody>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

// ── Handlers ────────────────────────────────────────────────────────

/// `POST /api/v1/security/block-ips` — install a blacklist rule for a set
/// of IP addresses.
#[utoipa::path(
    post, path = "/api/v1/security/block-ips",
    tag = "Security Rules",
    request_body = BlockIpsRequest,
    responses(
        (status = 201, description = "Blacklist rule installed"),
        (status = 400, description = "Validation error", body = ErrorBody),
    )
)]
pub async fn block_ips(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BlockIpsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.ip_addresses.is_empty() {
        return Err(ApiError::bad_request("ip_addresses is required"));
    }
    let reason = req.reason.unwrap_or_else(|| "blocked by admin".to_string());
    let parameters = HashMap::from([("reason".to_string(), json!(reason))]);

    let id = state
        .admission
        .create_ip_based_rule(&req.ip_addresses, ActionType::Block, parameters)?;

    tracing::info!(rule_id = %id, count = req.ip_addresses.len(), "IP blacklist rule created via API");
    Ok((StatusCode::CREATED, Json(json!({ "id": id.0 }))))
}

/// `POST /api/v1/security/rate-limit-resources` — install a `rate_limit`
/// rule covering a set of resources.
#[utoipa::path(
    post, path = "/api/v1/security/rate-limit-resources",
    tag = "Security Rules",
    request_body = RateLimitResourcesRequest,
    responses(
        (status = 201, description = "Rate limit rule installed"),
        (status = 400, description = "Validation error", body = ErrorBody),
    )
)]
pub async fn rate_limit_resources(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RateLimitResourcesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.resources.is_empty() {
        return Err(ApiError::bad_request("resources is required"));
    }
    if req.limit == 0 {
        return Err(ApiError::bad_request("limit must be positive"));
    }
    let window = parse_window(&req.window)?;
    let algorithm = parse_algorithm(req.algorithm.as_deref())?;

    let id = state
        .admission
        .create_resource_based_rule(&req.resources, req.limit, window, algorithm)?;

    tracing::info!(rule_id = %id, resources = req.resources.len(), "resource rate limit rule created via API");
    Ok((StatusCode::CREATED, Json(json!({ "id": id.0 }))))
}

/// `POST /api/v1/security/rules` — create a security rule from a full
/// definition.
#[utoipa::path(
    post, path = "/api/v1/security/rules",
    tag = "Security Rules",
    request_body = CreateSecurityRuleRequest,
    responses(
        (status = 201, description = "Rule created"),
        (status = 400, description = "Validation error", body = ErrorBody),
    )
)]
pub async fn create_security_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSecurityRuleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_required("name", &req.name)?;
    validate_string_length("name", &req.name, MAX_NAME_LENGTH)?;

    let now = state.clock.now();
    let rule = Rule {
        id: RuleId(String::new()),
        name: req.name,
        rule_type: req.rule_type,
        description: req.description,
        priority: req.priority,
        enabled: req.enabled,
        conditions: req
            .conditions
            .into_iter()
            .map(|c| RuleCondition {
                field: c.field,
                operator: c.operator,
                value: c.value,
            })
            .collect(),
        actions: req
            .actions
            .into_iter()
            .map(|a| RuleAction {
                kind: a.kind,
                parameters: a.parameters,
            })
            .collect(),
        tags: req.tags,
        created_at: now,
        updated_at: now,
    };

    let id = state.admission.rule_engine().create_rule(rule)?;
    tracing::info!(rule_id = %id, "security rule created via API");
    Ok((StatusCode::CREATED, Json(json!({ "id": id.0 }))))
}

/// `GET /api/v1/security/rules/{id}` — fetch one security rule.
#[utoipa::path(
    get, path = "/api/v1/security/rules/{id}",
    tag = "Security Rules",
    params(("id" = String, Path, description = "Rule identifier")),
    responses(
        (status = 200, description = "The rule"),
        (status = 404, description = "Rule not found", body = ErrorBody),
    )
)]
pub async fn get_security_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Rule>, ApiError> {
    validate_string_length("id", &id, MAX_ID_LENGTH)?;
    let rule = state.admission.rule_engine().get_rule(&RuleId(id))?;
    Ok(Json(rule))
}

/// `DELETE /api/v1/security/rules/{id}` — delete a security rule.
#[utoipa::path(
    delete, path = "/api/v1/security/rules/{id}",
    tag = "Security Rules",
    params(("id" = String, Path, description = "Rule identifier")),
    responses(
        (status = 204, description = "Rule deleted"),
        (status = 404, description = "Rule not found", body = ErrorBody),
    )
)]
pub async fn delete_security_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_string_length("id", &id, MAX_ID_LENGTH)?;
    state.admission.rule_engine().delete_rule(&RuleId(id.clone()))?;
    tracing::info!(rule_id = %id, "security rule deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rule_request_parses_full_definition() {
        let req: CreateSecurityRuleRequest = serde_json::from_str(
            r#"{
                "name": "Block bots",
                "type": "blacklist",
                "priority": 200,
                "conditions": [
                    {"field": "user_agent", "operator": "contains", "value": "bot"}
                ],
                "actions": [
                    {"type": "deny", "parameters": {"reason": "bot"}}
                ],
                "tags": ["security"]
            }"#,
        )
        .unwrap();
        assert_eq!(req.rule_type, RuleType::Blacklist);
        assert!(req.enabled);
        assert_eq!(req.conditions.len(), 1);
        assert_eq!(req.actions[0].kind, ActionType::Deny);
    }

    #[test]
    fn create_rule_request_rejects_unknown_operator() {
        let result: Result<CreateSecurityRuleRequest, _> = serde_json::from_str(
            r#"{
                "name": "x", "type": "blacklist", "priority": 1,
                "conditions": [{"field": "a", "operator": "regex", "value": "b"}],
                "actions": [{"type": "deny"}]
            }"#,
        );
        assert!(result.is_err());
    }
}
