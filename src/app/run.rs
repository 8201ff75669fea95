use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::{
    app::{
        self,
        config::{AppConfig, StoreBackend},
    },
    auth::rate_limit,
    error::AppError,
    realtime::registry,
    telemetry,
};

pub async fn run() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing()
        .map_err(|err| AppError::Internal(format!("telemetry init failed: {}", err)))?;

    let config = AppConfig::from_env()?;

    let state = match (&config.store, &config.database) {
        (StoreBackend::Postgres, Some(database)) => {
            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .min_connections(database.min_connections)
                .acquire_timeout(database.acquire_timeout)
                .connect(&database.url)
                .await
                .map_err(AppError::Database)?;
            app::state::AppState::with_pool(pool, &config)
        }
        _ => {
            tracing::warn!("Using in-memory comment store; data is lost on restart");
            app::state::AppState::in_memory(&config)
        }
    };

    let maintenance = registry::spawn_maintenance(
        state.threads.clone(),
        config.snapshot_refresh,
        config.thread_idle,
    );
    let limiter_cleanup =
        rate_limit::spawn_limiter_cleanup(state.submit_limiter.clone(), config.thread_idle);

    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|err| AppError::Internal(format!("CORS_ORIGIN invalid: {}", err)))?;
    let app = app::router::build_router(state, cors_origin);

    let addr = config.bind_addr;
    tracing::info!(%addr, "Server listening");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Internal(format!("bind failed: {}", err)))?;
    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|err| AppError::Internal(format!("server error: {}", err)));
    maintenance.abort();
    limiter_cleanup.abort();
    telemetry::shutdown_tracing();
    result?;
    Ok(())
}
