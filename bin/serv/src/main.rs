use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use bsso_api::{
    ApiState, LoggingIdentityResolver,
    config::ApiConfig,
    metrics::{init_metrics, metrics_handler, track_metrics},
    middleware::{
        cors::create_cors_layer, request_id::request_id_middleware,
        security_headers::apply_security_headers,
    },
    providers::PgProviderStore,
    router,
    tracing::init_tracing,
};
use bsso_oauth::{MemoryProviderStore, ProviderStore};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from .env and the environment
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    init_tracing(&config.env);

    let metrics_handle = init_metrics()?;
    tracing::info!("Prometheus metrics exporter initialized");

    let store: Arc<dyn ProviderStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = bsso_db::create_pool(database_url, config.database_max_connections).await?;
            bsso_db::ensure_db_and_migrate(database_url, &pool).await?;
            tracing::info!("Provider configuration stored in PostgreSQL");
            Arc::new(PgProviderStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, provider configuration is kept in memory");
            Arc::new(MemoryProviderStore::new())
        }
    };

    let state = ApiState::new(&config, store, Arc::new(LoggingIdentityResolver))?;

    let cors = create_cors_layer(config.parsed_allowed_origins());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let metrics_app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let app = router::router()
        .with_state(state)
        .merge(metrics_app)
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(track_metrics))
        .layer(middleware::from_fn(request_id_middleware));

    let app = apply_security_headers(app, config.env);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(environment = ?config.env, "SSO service listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");
}
