use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sheet_store::{DatasetManager, HttpServer, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheet_store=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sheet Store v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::from_env()?;

    info!("Configuration loaded:");
    info!("  Port: {}", config.port);
    info!("  Database: {}", config.database_url);
    info!("  Upload directory: {}", config.upload_dir.display());
    info!("  Max upload size: {} bytes", config.max_upload_bytes);

    let manager = Arc::new(DatasetManager::new(&config).await?);
    info!("Dataset store initialized successfully");

    let http_server = HttpServer::new(manager, config.max_upload_bytes);
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let http_handle = tokio::spawn(async move {
        if let Err(e) = http_server.start(addr).await {
            error!("HTTP server error: {}", e);
        }
    });

    info!("Server running at http://localhost:{}", config.port);

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, gracefully shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    http_handle.abort();

    info!("Sheet Store shutdown complete");
    Ok(())
}
