use puzzle_service::{
    build_router, config::PuzzleConfig, db, services::Database, AppState,
};
use service_core::observability::logging::init_tracing;
use service_core::tasks::TaskSupervisor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = PuzzleConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting puzzle service"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect to PostgreSQL: {}", e))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {}", e))?;

    let store = Arc::new(Database::new(pool.clone(), config.database.query_timeout()));
    let tasks = TaskSupervisor::new();

    if config.rate_limit.enabled {
        tracing::info!(
            rps = config.rate_limit.requests_per_second,
            burst = config.rate_limit.burst,
            "IP rate limiting enabled"
        );
    }

    let state = AppState::new(config.clone(), store, tasks.clone());
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let drain_timeout = Duration::from_secs(config.common.shutdown_timeout_seconds);
    if tokio::time::timeout(drain_timeout, tasks.drain()).await.is_err() {
        tracing::warn!(
            outstanding = tasks.outstanding(),
            "Background tasks still running at shutdown deadline"
        );
    }

    pool.close().await;
    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
