use std::sync::Arc;

use clap::Parser;

use plexbridge_core::config::Config;
use plexbridge_server::{BridgeState, start_server};

#[derive(Parser)]
#[command(
    name = "plexbridge",
    about = "Bridge server between query clients and the browser peer",
    version
)]
struct Cli {
    /// Port to listen on (default: 7890, or the config file value)
    #[arg(long)]
    port: Option<u16>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config_path = cli
        .config
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::config_path);
    let config = Arc::new(Config::load(&config_path)?);

    let port = cli.port.unwrap_or_else(|| config.server_port());
    let state = Arc::new(BridgeState::new(config));

    start_server(state, port).await
}
