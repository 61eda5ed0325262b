use plexbridge_core::config::DEFAULT_PORT;
use plexbridge_mcp::{BridgeClient, McpServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let host = std::env::var("PLEXBRIDGE_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("PLEXBRIDGE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let bridge = BridgeClient::new(&host, port)?;
    tracing::info!("PlexBridge MCP server running on stdio");

    McpServer::new(bridge).run().await
}
