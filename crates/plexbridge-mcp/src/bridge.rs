//! HTTP client for the bridge server.

use std::time::Duration;

use anyhow::Context;
use serde_json::{Value, json};
use tracing::debug;

use plexbridge_core::protocol::{AskRequest, AskResponse, StatusResponse};

/// Queries take minutes; status checks must return immediately.
const ASK_TIMEOUT: Duration = Duration::from_secs(300);
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

pub struct BridgeClient {
    base_url: String,
    client: reqwest::Client,
}

impl BridgeClient {
    pub fn new(host: &str, port: u16) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: format!("http://{host}:{port}"),
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Base URL of the bridge, for operator-facing messages.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a query and wait for the bridge to resolve it.
    pub async fn ask(&self, query: &str, new_thread: bool) -> anyhow::Result<AskResponse> {
        debug!(new_thread, "Forwarding query to bridge");
        let response = self
            .client
            .post(format!("{}/ask", self.base_url))
            .timeout(ASK_TIMEOUT)
            .json(&AskRequest {
                query: query.to_string(),
                new_thread,
                timeout_ms: None,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after 5 minutes")
                } else {
                    anyhow::Error::from(e)
                }
            })?;

        response
            .json::<AskResponse>()
            .await
            .context("Invalid response from bridge")
    }

    /// Probe the bridge and describe its state. Never errors: an
    /// unreachable bridge is itself a reportable status.
    pub async fn status(&self) -> Value {
        let result = self
            .client
            .get(format!("{}/status", self.base_url))
            .timeout(STATUS_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => match response.json::<StatusResponse>().await {
                Ok(status) => {
                    let message = if status.peer_connected {
                        "Ready - bridge server and browser peer connected"
                    } else {
                        "Bridge server running but browser peer not connected"
                    };
                    json!({
                        "connected": status.peer_connected,
                        "server": true,
                        "peer": status.peer_connected,
                        "message": message,
                    })
                }
                Err(e) => json!({
                    "connected": false,
                    "server": true,
                    "peer": false,
                    "message": "Bridge returned an unreadable status",
                    "error": e.to_string(),
                }),
            },
            Err(e) => json!({
                "connected": false,
                "server": false,
                "peer": false,
                "message": format!(
                    "Bridge server not reachable at {}. Start it with: plexbridge",
                    self.base_url
                ),
                "error": e.to_string(),
            }),
        }
    }
}
