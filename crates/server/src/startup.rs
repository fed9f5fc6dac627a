use std::path::Path;
use std::sync::Arc;

use adapters::bus::{InMemoryEventBus, LogRuleEventSink};
use adapters::clock::SystemClock;
use adapters::http::router::build_router;
use adapters::http::state::AppState;
use adapters::storage::{
    InMemoryEventStore, InMemoryRateLimitRuleStore, InMemoryReadModel, InMemorySecurityRuleStore,
};
use anyhow::{Context, Result};
use application::admission_service_impl::AdmissionService;
use application::bootstrap::seed_defaults;
use application::command::CommandHandler;
use application::limiter_service_impl::RateLimiterService;
use application::projection::{ProjectionSink, spawn_projection};
use application::query::QueryHandler;
use application::rule_service_impl::RuleEngineService;
use infrastructure::config::ServiceConfig;
use infrastructure::logging::init_logging;
use infrastructure::metrics::ServiceMetrics;
use ports::secondary::clock::Clock;
use ports::secondary::event_sink::EventSink;
use ports::secondary::metrics_port::MetricsPort;

use crate::cli::Cli;
use crate::shutdown::Shutdown;

/// Load configuration, wire the decision pipeline, and serve until a
/// shutdown signal arrives.
pub async fn run(cli: &Cli) -> Result<()> {
    let mut config = load_config(&cli.config)?;
    if let Some(ref listen) = cli.listen {
        config.server.listen = listen.clone();
        config.validate().context("invalid listen override")?;
    }
    let level = cli.log_level.unwrap_or(config.log.level);
    let format = cli.log_format.unwrap_or(config.log.format);
    init_logging(level, format).context("failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen,
        "admission control service starting"
    );

    let metrics = Arc::new(ServiceMetrics::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    // Stores and bus.
    let event_store = Arc::new(InMemoryEventStore::new());
    let rate_limit_rules = Arc::new(InMemoryRateLimitRuleStore::new());
    let security_rules = Arc::new(InMemorySecurityRuleStore::new());
    let read_model = Arc::new(InMemoryReadModel::new(Arc::clone(&clock)));
    let bus = Arc::new(InMemoryEventBus::new(
        config.bus.capacity,
        Arc::clone(&metrics) as Arc<dyn MetricsPort>,
    ));

    // Write path folds into the read model inline and fans out on the bus;
    // the bus-driven projection below covers any additional subscribers and
    // is idempotent with the inline fold.
    let sink: Arc<dyn EventSink> = Arc::new(ProjectionSink::new(
        Arc::clone(&read_model) as _,
        Arc::clone(&bus) as _,
    ));

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();
    let projection = spawn_projection(
        bus.subscribe("*"),
        Arc::clone(&read_model) as _,
        shutdown.token(),
    );

    // Handlers and services.
    let commands = CommandHandler::new(
        Arc::clone(&event_store) as _,
        Arc::clone(&rate_limit_rules) as _,
        sink,
        Arc::clone(&clock),
    );
    let queries = QueryHandler::new(
        Arc::clone(&read_model) as _,
        Arc::clone(&rate_limit_rules) as _,
    );
    let limiter = RateLimiterService::new(commands, queries, Arc::clone(&clock));
    let rule_engine = RuleEngineService::new(
        Arc::clone(&security_rules) as _,
        Arc::new(LogRuleEventSink::new()),
        Arc::clone(&metrics) as _,
    );
    let admission = Arc::new(AdmissionService::new(
        limiter,
        rule_engine,
        Arc::clone(&rate_limit_rules) as _,
        Arc::clone(&metrics) as _,
        Arc::clone(&clock),
    ));

    if config.seed.defaults && !cli.no_seed {
        seed_defaults(admission.limiter(), admission.rule_engine(), clock.now())
            .context("failed to seed default configuration")?;
    }

    let state = Arc::new(AppState::new(admission, metrics, Arc::clone(&clock)));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    tracing::info!(addr = %config.server.listen, "HTTP server listening");

    let server_shutdown = shutdown.token();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    shutdown.trigger();
    if let Err(err) = projection.await {
        tracing::warn!(error = %err, "projection task did not shut down cleanly");
    }
    tracing::info!("admission control service stopped");
    Ok(())
}

fn load_config(path: &str) -> Result<ServiceConfig> {
    if Path::new(path).exists() {
        ServiceConfig::from_file(path).with_context(|| format!("failed to load config {path}"))
    } else {
        // Missing config is fine for local runs; defaults cover everything.
        Ok(ServiceConfig::default())
    }
}
