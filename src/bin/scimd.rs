//! Server entrypoint: reads `AppConfig` from the environment, selects a
//! store backend, wires up logging and the request-log writer, and serves
//! the HTTP router until shutdown.

use scim_server::config::AppConfig;
use scim_server::http::{self, AppState};
use scim_server::observability::{LogConfig, Logger, RequestLogWriter, TracingRequestLogSink};
use scim_server::store::{DynStore, InMemoryStore, SqliteStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::from_env();

    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match config.log_format {
        scim_server::observability::LogFormat::Json => subscriber.json().init(),
        scim_server::observability::LogFormat::Pretty => subscriber.init(),
    }

    let store = match &config.sqlite_dsn {
        Some(dsn) => DynStore::Sqlite(SqliteStore::connect(dsn).await?),
        None => DynStore::InMemory(InMemoryStore::new()),
    };

    let log_config = LogConfig { global_level: config.log_level, format: config.log_format, ..Default::default() };
    let logger = Arc::new(Logger::new(log_config, config.ring_buffer_capacity));

    let request_log = Arc::new(RequestLogWriter::new(TracingRequestLogSink));
    request_log.clone().spawn_ticker();

    let bind_address = config.bind_address.clone();
    let state = AppState::new(store, config, logger, request_log.clone());

    // Restore per-endpoint log-level overrides from persisted config — the
    // in-process override map starts empty on every launch.
    for endpoint in state.admin.list_endpoints(None).await? {
        if let Some(level) = scim_server::core::config_flags::log_level_override(&endpoint.config) {
            if let Ok(level) = level.parse() {
                state.logger.set_endpoint_level(&endpoint.id, level);
            }
        }
    }

    let router = http::build(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(category = "http", "listening on {bind_address}");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal(request_log)).await?;
    Ok(())
}

async fn shutdown_signal<S: scim_server::observability::RequestLogSink>(request_log: Arc<RequestLogWriter<S>>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(category = "http", "shutting down, flushing request log");
    request_log.flush().await;
}
