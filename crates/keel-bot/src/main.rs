//! keel trading core - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Order-lifecycle and risk-gated execution core.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via KEEL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    keel_bot::init_logging();

    info!("Starting keel v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("KEEL_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    info!(config_path = %config_path, "loading configuration");

    let config = keel_bot::AppConfig::load_or_default(&config_path)?;
    let mut app = keel_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
