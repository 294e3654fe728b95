//! WhiteRoom API server entry point.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use whiteroom_api::config::AppConfig;
use whiteroom_api::error::AppError;
use whiteroom_api::state::AppState;
use whiteroom_api::{build_router, telemetry};
use whiteroom_content::OpenAiContentGenerator;
use whiteroom_core::clock::{Clock, SystemClock};
use whiteroom_core::id::UuidIdGenerator;
use whiteroom_core::store::KeyValueStore;
use whiteroom_narrative::application::registry::SessionRegistry;
use whiteroom_session_store::{InMemoryKeyValueStore, PgKeyValueStore};

/// How often expired store entries and cached sessions are reclaimed.
const PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!(
        model = %config.openai.model,
        session_ttl_secs = config.session_ttl.as_secs(),
        "Starting WhiteRoom API server"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = open_store(&config, Arc::clone(&clock)).await?;
    let registry = Arc::new(SessionRegistry::new(
        store,
        Arc::clone(&clock),
        config.session_ttl,
    ));
    let sweeper = Arc::clone(&registry);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweeper.purge_expired();
            tracing::debug!(removed, "purged expired cached sessions");
        }
    });
    let generator = OpenAiContentGenerator::new(config.openai.clone())
        .map_err(|e| AppError::Config(format!("content generator: {e}")))?;

    let app_state = AppState::new(
        clock,
        Arc::new(UuidIdGenerator),
        registry,
        Arc::new(generator),
    );

    let app = build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config.cors_origin.as_deref())?);

    tracing::info!("Listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("WhiteRoom API server stopped");
    telemetry.shutdown();
    Ok(())
}

/// PostgreSQL when `DATABASE_URL` is set, process memory otherwise. Either
/// way a background task reclaims expired entries.
async fn open_store(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn KeyValueStore>, AppError> {
    if let Some(database_url) = &config.database_url {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = PgKeyValueStore::new(pool);
        store.migrate().await?;
        tracing::info!("using PostgreSQL session store");

        let purger = store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                match purger.purge_expired().await {
                    Ok(removed) => tracing::debug!(removed, "purged expired session entries"),
                    Err(e) => tracing::warn!(error = %e, "session entry purge failed"),
                }
            }
        });
        return Ok(Arc::new(store));
    }

    tracing::info!("DATABASE_URL not set; using in-process session store");
    let store = Arc::new(InMemoryKeyValueStore::new(clock));
    let purger = Arc::clone(&store);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = purger.purge_expired();
            tracing::debug!(removed, "purged expired session entries");
        }
    });
    let store: Arc<dyn KeyValueStore> = store;
    Ok(store)
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, AppError> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .map_err(|e| AppError::Config(format!("CORS_ORIGIN is not a valid origin: {e}")))?;
            Ok(layer.allow_origin(origin))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
