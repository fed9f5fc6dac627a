use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use utoipa::ToSchema;

use super::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(value_type = String)]
    pub status: &'static str,
    #[schema(value_type = String)]
    pub service: &'static str,
    #[schema(value_type = String)]
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// `GET /healthz` — liveness probe.
#[utoipa::path(
    get, path = "/healthz",
    tag = "Health",
    responses((status = 200, description = "Service is live", body = HealthResponse))
)]
pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "admission-control",
        version: state.version,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// `GET /readyz` — readiness probe.
#[utoipa::path(
    get, path = "/readyz",
    tag = "Health",
    responses((status = 200, description = "Service is ready", body = HealthResponse))
)]
pub async fn readyz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready",
        service: "admission-control",
        version: state.version,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
