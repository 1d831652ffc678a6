// src/main.rs

use quiz_server::config::Config;
use quiz_server::error::AppError;
use quiz_server::routes;
use quiz_server::seed;
use quiz_server::state::AppState;
use quiz_server::storage::{DynStorage, MemoryStorage, PgStorage};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "quiz-server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    let storage = connect_storage(&config).await?;

    if let Err(e) = seed::run(&storage, &config).await {
        tracing::error!("Failed to seed initial data: {}", e);
    }

    tracing::info!(policy = %config.review_policy, "Review scheduling policy");

    let state = AppState::new(storage, config.clone());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// PostgreSQL when `DATABASE_URL` is set (with retry and migrations),
/// otherwise the in-memory store.
async fn connect_storage(config: &Config) -> Result<DynStorage, AppError> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on exit");
        return Ok(Arc::new(MemoryStorage::new()));
    };

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(AppError::InternalServerError(format!(
                        "Failed to connect to database after 5 retries: {}",
                        e
                    )));
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };
    tracing::info!("Database connected...");

    let storage = PgStorage::new(pool);

    tracing::info!("Running migrations...");
    storage.migrate().await?;
    tracing::info!("Migrations applied successfully.");

    Ok(Arc::new(storage))
}
