use std::sync::Arc;
use std::time::Instant;

use application::admission_service_impl::AdmissionService;
use infrastructure::metrics::ServiceMetrics;
use ports::secondary::clock::Clock;

/// Shared application state for the REST API server.
///
/// Passed to Axum handlers via `State(Arc<AppState>)`.
pub struct AppState {
    pub admission: Arc<AdmissionService>,
    pub metrics: Arc<ServiceMetrics>,
    pub clock: Arc<dyn Clock>,
    pub start_time: Instant,
    pub version: &'static str,
}

impl AppState {
    pub fn new(
        admission: Arc<AdmissionService>,
        metrics: Arc<ServiceMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            admission,
            metrics,
            clock,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
