//! Bulkload Server - Main entry point

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bulkload_common::logging::{init_logging, LogConfig};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use bulkload_engine::{
    engine::IngestionEngine,
    fault::{FaultInjector, NoFaults, RandomFaults},
};
use bulkload_server::{
    config::Config, db::PgRecordStore, features, middleware, state::RedisJobStateStore,
    storage::UploadStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::from_env()?
        .with_file_prefix("bulkload-server")
        .with_filter_directives("bulkload_server=debug,bulkload_engine=debug,tower_http=debug,sqlx=info");

    init_logging(&log_config)?;

    info!("Starting Bulkload Server");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;

    info!("Database connection pool established");

    // Run migrations
    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    // Connect the job state store
    let state_store = RedisJobStateStore::connect(&config.redis.url).await?;
    info!("Job state store connected at {}", config.redis.url);

    // Prepare the upload retention directory
    let uploads = UploadStore::new(&config.uploads.dir);
    uploads.init().await?;
    info!("Upload directory ready at {}", config.uploads.dir);

    // Assemble the ingestion engine
    let faults: Arc<dyn FaultInjector> = if config.engine.fault_probability > 0.0 {
        info!(
            probability = config.engine.fault_probability,
            "Fault injection enabled"
        );
        Arc::new(RandomFaults::new(config.engine.fault_probability)?)
    } else {
        Arc::new(NoFaults)
    };

    let engine = Arc::new(
        IngestionEngine::new(
            Arc::new(PgRecordStore::new(db_pool.clone())),
            Arc::new(state_store.clone()),
            faults,
        )
        .with_checkpoint_interval(config.engine.checkpoint_interval),
    );

    let feature_state = features::FeatureState {
        state_store: Arc::new(state_store),
        record_store: Arc::new(PgRecordStore::new(db_pool.clone())),
        uploads,
        engine,
    };

    // Build the application router
    let app = create_router(db_pool, feature_state, &config);

    // Create socket address
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(db: sqlx::PgPool, feature_state: features::FeatureState, config: &Config) -> Router {
    let feature_routes = features::router(feature_state);

    Router::new()
        .route("/health", get(health_check))
        .with_state(db)
        .nest("/api", feature_routes)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(db): State<sqlx::PgPool>) -> Result<Response, StatusCode> {
    // Check database connectivity
    match sqlx::query("SELECT 1").fetch_one(&db).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give in-flight requests and checkpoint writes time to land
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
