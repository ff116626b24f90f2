use tokio::io::{stdin, stdout, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sheet_viewer::{SheetStoreClient, Shell, ViewerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheet_viewer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Sheet Viewer v{}", env!("CARGO_PKG_VERSION"));

    let config = ViewerConfig::from_env()?;
    let client = SheetStoreClient::new(&config.sheet_store_url)?;

    if let Err(e) = client.health_check().await {
        warn!(
            "Sheet store at {} is not reachable yet: {}",
            client.base_url(),
            e
        );
    }

    let mut shell = Shell::new(client);
    shell.run(BufReader::new(stdin()), stdout()).await?;

    info!("Sheet Viewer shutdown complete");
    Ok(())
}
