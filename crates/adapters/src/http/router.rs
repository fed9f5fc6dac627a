use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use utoipa::OpenApi;

use super::admission_handler::check_request;
use super::health_handler::{healthz, readyz};
use super::metrics_handler::metrics;
use super::ratelimit_handler::{
    create_rule, get_client_stats, get_history, get_status, list_rules, reset,
};
use super::security_handler::{
    block_ips, create_security_rule, delete_security_rule, get_security_rule,
    rate_limit_resources,
};
use super::state::AppState;

/// Maximum request body size for API endpoints (64 KiB).
const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::admission_handler::check_request,
        super::health_handler::healthz,
        super::health_handler::readyz,
        super::metrics_handler::metrics,
        super::ratelimit_handler::create_rule,
        super::ratelimit_handler::list_rules,
        super::ratelimit_handler::get_status,
        super::ratelimit_handler::get_history,
        super::ratelimit_handler::get_client_stats,
        super::ratelimit_handler::reset,
        super::security_handler::block_ips,
        super::security_handler::rate_limit_resources,
        super::security_handler::create_security_rule,
        super::security_handler::get_security_rule,
        super::security_handler::delete_security_rule,
    ),
    info(
        title = "Admission Control API",
        description = "Rule-driven admission control with event-sourced rate limiting"
    )
)]
pub struct ApiDoc;

/// Build the Axum router with all REST API routes.
///
/// `/healthz`, `/readyz`, and `/metrics` are probe routes; everything else
/// lives under `/api/v1`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let probe_routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics));

    let api_routes = Router::new()
        .route("/api/v1/check", post(check_request))
        .route("/api/v1/ratelimit/rules", post(create_rule).get(list_rules))
        .route("/api/v1/ratelimit/status", get(get_status))
        .route("/api/v1/ratelimit/history", get(get_history))
        .route("/api/v1/ratelimit/reset", post(reset))
        .route("/api/v1/clients/{client_id}/stats", get(get_client_stats))
        .route("/api/v1/security/block-ips", post(block_ips))
        .route(
            "/api/v1/security/rate-limit-resources",
            post(rate_limit_resources),
        )
        .route("/api/v1/security/rules", post(create_security_rule))
        .route(
            "/api/v1/security/rules/{id}",
            get(get_security_rule).delete(delete_security_rule),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    probe_routes.merge(api_routes).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/check"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/ratelimit/rules"));
        assert!(
            paths
                .iter()
                .any(|p| p.as_str() == "/api/v1/security/block-ips")
        );
        assert!(paths.iter().any(|p| p.as_str() == "/healthz"));
    }
}
