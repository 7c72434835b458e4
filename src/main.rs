//! Catalog Server - library catalog and loans
//!
//! REST API server for the library catalog.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::writer::MakeWriterExt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use catalog_server::{
    api,
    clock::SystemClock,
    config::{AppConfig, LogFormat, LoggingConfig, StorageBackend, StorageConfig, DatabaseConfig},
    repository::Repository,
    services::{access::ClaimsGate, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Keep the file writer alive for the life of the process
    let _guard = init_tracing(&config.logging)?;

    tracing::info!("Starting Catalog Server v{}", env!("CARGO_PKG_VERSION"));

    let repository = open_repository(&config.storage, &config.database).await?;

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let services = Services::new(repository, config.loans, Arc::new(ClaimsGate));

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
        clock: Arc::new(SystemClock),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Stdout logging, plus daily rolling files when a directory is configured
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("catalog_server={},tower_http=debug", logging.level).into());

    let (file_writer, guard) = match &logging.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("catalog-server")
                .filename_suffix("log")
                .build(dir)
                .context("Failed to open log directory")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let fmt_layer = match (logging.format, file_writer) {
        (LogFormat::Json, Some(file)) => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stdout.and(file))
            .boxed(),
        (LogFormat::Json, None) => tracing_subscriber::fmt::layer().json().boxed(),
        (LogFormat::Pretty, Some(file)) => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout.and(file))
            .boxed(),
        (LogFormat::Pretty, None) => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    Ok(guard)
}

async fn open_repository(storage: &StorageConfig, database: &DatabaseConfig) -> anyhow::Result<Repository> {
    match storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; records are lost on restart");
            Ok(Repository::in_memory())
        }
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .min_connections(database.min_connections)
                .connect(&database.url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!("Database migrations completed");

            Ok(Repository::postgres(pool))
        }
    }
}
