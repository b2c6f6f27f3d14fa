//! aerie-collector - capture collector service
//!
//! Receives records from the browser extension, stores them in SQLite and
//! answers status lookups for the classifier and the sync client.

use aerie_collector::{build_router, AppState};
use aerie_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use aerie_common::Store;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for aerie-collector
#[derive(Parser, Debug)]
#[command(name = "aerie-collector")]
#[command(about = "Collector service for captured timeline records")]
#[command(version)]
struct Args {
    /// Root folder holding tweets.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: AERIE_CONFIG, then ~/.config/aerie/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding [collector] host/port
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so the log level can come from it
    let config_result = TomlConfig::load(args.config.as_deref());
    let config = config_result.as_ref().cloned().unwrap_or_default();

    let level = config
        .logging
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!(
        "Starting Aerie Collector (aerie-collector) v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = config_result {
        error!("Config file rejected, using built-in defaults: {}", e);
    }

    let root_folder = RootFolderResolver::new("aerie-collector")
        .with_cli_arg(args.root_folder)
        .with_config(&config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let store = Store::open(&db_path)
        .await
        .context("Failed to open database")?;
    let stats = store.stats().await.context("Failed to read store stats")?;
    info!(
        total = stats.total,
        pending = stats.pending,
        approved = stats.approved,
        filtered = stats.filtered,
        "Store ready"
    );

    let app = build_router(AppState::new(store));

    let bind_address = args
        .bind
        .unwrap_or_else(|| config.collector.bind_address());
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
