//! # certvault-api: Binary Entry Point
//!
//! Reads configuration from the environment, picks the Postgres or
//! in-memory store, and serves the API (default port 5000).

use std::net::SocketAddr;
use std::sync::Arc;

use certvault_api::state::{AppConfig, AppState};
use certvault_api::store::{postgres, CertificateStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::debug!(?config, "configuration loaded");

    let store: Arc<dyn CertificateStore> = match &config.database_url {
        Some(url) => {
            let pool = postgres::init_pool(url, config.database_max_connections)
                .await
                .map_err(|e| {
                    tracing::error!("Database initialization failed: {e}");
                    e
                })?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, using the in-memory store. \
                 Certificates will not survive restarts."
            );
            Arc::new(MemoryStore::new())
        }
    };

    let port = config.port;
    let state = AppState::with_config(config, store);
    let app = certvault_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("certvault API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("shutdown signal received");
}
