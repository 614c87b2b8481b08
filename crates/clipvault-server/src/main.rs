mod error;
mod handlers;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clipvault::{apply_env_overrides, init_logging, load_config, IngestService};

use crate::state::AppState;

const DEFAULT_CONFIG_FILE: &str = "clipvault.json";

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CLIPVAULT_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let path = config_path();
    let mut config = load_config(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    apply_env_overrides(&mut config)?;

    init_logging(&config.logging)?;

    let bind_address = config.bind_address();
    let ingest = tokio::task::spawn_blocking(move || IngestService::from_config(config))
        .await?
        .context("Failed to start ingest service")?;
    let ingest = Arc::new(ingest);

    let app = routes::router(AppState::new(Arc::clone(&ingest)));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(addr = %bind_address, "Server ready and accepting connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Draining queued jobs...");
    tokio::task::spawn_blocking(move || ingest.shutdown()).await?;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }
}
