use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use cv_matcher::{
    app_state::AppState,
    config::AppConfig,
    db::{self, matches::PgMatchStore, queries::PgProfileSource},
    routes,
    services::{
        actions::ProfileActions, attachment::CommandAttachmentGenerator, cv_list::CvListNotifier,
        events::DashboardEvents, hooks::HttpHookDispatcher, processor::MatchProcessor,
        profile_cache::ProfileCache, queue::MatchQueue,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing cv-matcher server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let dispatcher =
        HttpHookDispatcher::new(config.hook_timeout()).expect("Failed to build HTTP client");
    let events = Arc::new(DashboardEvents::new());
    let store = Arc::new(PgMatchStore::new(db_pool.clone()));
    let cv_lists = CvListNotifier::new(store.clone(), Arc::new(dispatcher.clone()));
    let actions = ProfileActions::new(
        dispatcher.clone(),
        db_pool.clone(),
        config.debug_send_emails_to.clone(),
    );

    let mut processor = MatchProcessor::new(
        store.clone(),
        store,
        Arc::new(dispatcher),
        events.clone(),
        Arc::new(actions),
    );
    if let Some(path) = &config.attachment_generator_path {
        tracing::info!(path = %path, "CV attachments enabled");
        processor = processor.with_attachments(Arc::new(CommandAttachmentGenerator::new(path)));
    }

    let queue = MatchQueue::new(Arc::new(processor)).expect("Failed to create match queue");
    let profiles = ProfileCache::new(
        Arc::new(PgProfileSource::new(db_pool.clone())),
        config.profile_cache_ttl(),
    );
    let list_profiles = ProfileCache::new(
        Arc::new(PgProfileSource::cv_lists(db_pool.clone())),
        config.profile_cache_ttl(),
    );

    let state = AppState::new(db_pool, profiles, list_profiles, queue, events, cv_lists);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/scraper/scan-cv", post(routes::scan::scan_cv))
        .route("/api/v1/scraper/scan-cv-list", post(routes::scan::scan_cv_list))
        .route(
            "/api/v1/control/reload-profiles",
            get(routes::control::reload_profiles),
        )
        .route("/api/v1/events", get(routes::events::dashboard_events))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024)); // 2 MB limit

    tracing::info!("Starting cv-matcher on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
