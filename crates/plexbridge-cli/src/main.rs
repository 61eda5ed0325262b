//! `plexask` — send a query through the bridge and print the answer.

use std::io::{IsTerminal, Read};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;

use plexbridge_core::protocol::{AskRequest, AskResponse};

#[derive(Parser)]
#[command(
    name = "plexask",
    about = "Ask a question through the PlexBridge browser peer",
    after_help = "With no query arguments, the query is read from stdin:\n    cat build.log | plexask\nFollow-up questions stay in the current thread unless --new is given.",
    version
)]
struct Cli {
    /// The question to ask (joined with spaces; omit to read from stdin)
    query: Vec<String>,

    /// Start a new conversation thread instead of following up
    #[arg(short = 'n', long = "new")]
    new_thread: bool,

    /// Bridge host
    #[arg(long, env = "PLEXBRIDGE_HOST", default_value = "localhost")]
    host: String,

    /// Bridge port
    #[arg(long, env = "PLEXBRIDGE_PORT", default_value_t = 7890)]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Resolve the query from arguments or, when piped, from stdin.
fn resolve_query(args: &[String]) -> anyhow::Result<String> {
    if !args.is_empty() {
        return Ok(args.join(" "));
    }

    if std::io::stdin().is_terminal() {
        bail!(
            "No query provided. Pass it as arguments or pipe it in:\n    \
             plexask \"your question here\"\n    \
             cat file.log | plexask"
        );
    }

    let mut data = String::new();
    std::io::stdin()
        .read_to_string(&mut data)
        .context("Failed to read query from stdin")?;
    Ok(data.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let query = resolve_query(&cli.query)?;
    if query.is_empty() {
        bail!("No query provided");
    }

    let mode = if cli.new_thread { "new thread" } else { "follow-up" };
    let preview: String = query.chars().take(100).collect();
    let ellipsis = if query.chars().count() > 100 { "..." } else { "" };
    eprintln!("Query ({mode}): \"{preview}{ellipsis}\"");
    eprintln!("Waiting for answer...");

    let url = format!("http://{}:{}/ask", cli.host, cli.port);
    tracing::debug!(%url, "Submitting query");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(600))
        .build()?;

    let response = client
        .post(&url)
        .json(&AskRequest {
            query,
            new_thread: cli.new_thread,
            timeout_ms: None,
        })
        .send()
        .await
        .map_err(|e| {
            if e.is_connect() {
                anyhow::anyhow!(
                    "Cannot connect to the bridge at {url}. Start it with: plexbridge"
                )
            } else if e.is_timeout() {
                anyhow::anyhow!("Request timeout")
            } else {
                anyhow::Error::from(e)
            }
        })?;

    let body: AskResponse = response
        .json()
        .await
        .context("Invalid response from server")?;

    if body.success {
        println!("{}", body.answer.unwrap_or_default());
        Ok(())
    } else {
        bail!(
            "{}",
            body.error.unwrap_or_else(|| "Unknown error".to_string())
        )
    }
}
