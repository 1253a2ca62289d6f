//! Drive Jukebox
//!
//! Serves a song catalog built by crawling a Google Drive folder tree, and
//! relays individual audio files from Drive to HTTP clients.

mod cli;
mod config;
mod config_file;
mod error;
mod http;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use drive_catalog::DriveClient;

use crate::cli::Cli;
use crate::config::{LogFormat, ServerConfig};
use crate::error::{Result, ServerError};
use crate::http::create_router;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "drive-jukebox";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.generate_config {
        config_file::generate_default_config(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = config_file::load_or_default(&cli.config)?;
    cli.apply(&mut config);

    init_logging(&config)?;

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    tracing::info!(
        "Configuration loaded from {} (root folder {:?}, static dir {:?})",
        cli.config.display(),
        config.drive.folder_id,
        config.static_dir
    );

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e);
    }

    let client = DriveClient::new(config.drive.client_config())?;
    tracing::info!("Drive client ready ({})", client.api_base());

    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| ServerError::Config(format!("Invalid bind address: {}", e)))?;

    let state = Arc::new(AppState::new(config, Arc::new(client)));
    let app = create_router(state);

    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Default filter when `RUST_LOG` is not set
fn default_filter(level: &str) -> String {
    format!(
        "drive_jukebox={0},drive_catalog={0},tower_http={0}",
        level
    )
}

/// Initialize logging with tracing
fn init_logging(config: &ServerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    result.map_err(|e| ServerError::Internal(format!("Failed to initialize logging: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("debug"),
            "drive_jukebox=debug,drive_catalog=debug,tower_http=debug"
        );
    }
}
