//! MCP stdio server loop and tool dispatch.

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::bridge::BridgeClient;
use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR,
};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

pub struct McpServer {
    bridge: BridgeClient,
}

impl McpServer {
    pub fn new(bridge: BridgeClient) -> Self {
        Self { bridge }
    }

    /// Serve MCP over stdio: one JSON-RPC message per line in on stdin,
    /// responses out on stdout. Logs go to stderr only.
    pub async fn run(&self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    warn!(%e, "Unparseable JSON-RPC message");
                    Some(JsonRpcResponse::err(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ))
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle one message. Notifications (no id) get no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "Handling request");

        let Some(id) = request.id else {
            // Notification; nothing to answer.
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::ok(
                id,
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": "plexbridge",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
            "ping" => JsonRpcResponse::ok(id, json!({})),
            "tools/list" => JsonRpcResponse::ok(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tool_call(id, request.params).await,
            other => JsonRpcResponse::err(
                id,
                METHOD_NOT_FOUND,
                format!("Unknown method: {other}"),
            ),
        };

        Some(response)
    }

    async fn handle_tool_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = params.unwrap_or_default();
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::err(id, INVALID_PARAMS, "Missing tool name");
        };
        let args = params.get("arguments").cloned().unwrap_or(json!({}));

        let result = match name {
            "plex_search" => self.run_query_tool(&args, true, "Search Results").await,
            "plex_followup" => self.run_query_tool(&args, false, "Follow-up Results").await,
            "plex_status" => {
                let status = self.bridge.status().await;
                match serde_json::to_string_pretty(&status) {
                    Ok(text) => Ok(tool_text(text, false)),
                    Err(e) => Err(e.to_string()),
                }
            }
            other => Ok(tool_text(format!("Unknown tool: {other}"), true)),
        };

        match result {
            Ok(payload) => JsonRpcResponse::ok(id, payload),
            Err(message) => JsonRpcResponse::err(id, INTERNAL_ERROR, message),
        }
    }

    /// Run `plex_search` or `plex_followup` against the bridge.
    async fn run_query_tool(
        &self,
        args: &Value,
        new_thread: bool,
        heading: &str,
    ) -> Result<Value, String> {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return Ok(tool_text("Error: query parameter is required", true));
        };

        match self.bridge.ask(query, new_thread).await {
            Ok(response) if response.success => {
                let answer = response.answer.unwrap_or_default();
                Ok(tool_text(
                    format!("## {heading}\n\n**Query:** {query}\n\n---\n\n{answer}"),
                    false,
                ))
            }
            Ok(response) => Ok(tool_text(
                format!(
                    "Error: {}",
                    response.error.unwrap_or_else(|| "Unknown error".to_string())
                ),
                true,
            )),
            Err(e) => Ok(tool_text(format!("Error: {e}"), true)),
        }
    }
}

/// Build an MCP tool result payload.
fn tool_text(text: impl Into<String>, is_error: bool) -> Value {
    let mut payload = json!({
        "content": [{ "type": "text", "text": text.into() }],
    });
    if is_error {
        payload["isError"] = json!(true);
    }
    payload
}

/// The tool catalog advertised by `tools/list`.
fn tool_definitions() -> Value {
    json!([
        {
            "name": "plex_search",
            "description": "Search the web through the connected browser peer. Returns comprehensive, sourced answers.\n\nUSE THIS TOOL FOR:\n- Current events, news, real-time information\n- Facts that may have changed since your training\n- Research requiring multiple sources\n\nTIMEOUT: this tool can take 1-5 MINUTES to return results. Wait for the full response.\nStarts a new conversation thread.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The question to search for. Be specific and detailed for best results.",
                    },
                },
                "required": ["query"],
            },
        },
        {
            "name": "plex_followup",
            "description": "Ask a follow-up question in the current thread.\n\nUSE THIS TOOL FOR:\n- Drilling deeper into a previous search result\n- Asking clarifying questions about the last answer\n\nTIMEOUT: this tool can take 1-5 MINUTES to return results. Wait for the full response.\nOnly works after plex_search has been called.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The follow-up question to ask.",
                    },
                },
                "required": ["query"],
            },
        },
        {
            "name": "plex_status",
            "description": "Check whether the bridge server and browser peer are connected and ready. Returns immediately.",
            "inputSchema": {
                "type": "object",
                "properties": {},
                "required": [],
            },
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server() -> McpServer {
        // Points at a closed port; only status (which tolerates an
        // unreachable bridge) and non-network methods are exercised.
        McpServer::new(BridgeClient::new("127.0.0.1", 1).unwrap())
    }

    fn request(raw: &str) -> JsonRpcRequest {
        serde_json::from_str(raw).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = test_server();
        let response = server
            .handle(request(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "plexbridge");
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = test_server();
        let response = server
            .handle(request(
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            ))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tools_list_advertises_three_tools() {
        let server = test_server();
        let response = server
            .handle(request(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#))
            .await
            .unwrap();

        let tools = response.result.unwrap()["tools"].clone();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["plex_search", "plex_followup", "plex_status"]);
    }

    #[tokio::test]
    async fn test_unknown_method_errors() {
        let server = test_server();
        let response = server
            .handle(request(r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tool_call_missing_query_is_tool_error() {
        let server = test_server();
        let response = server
            .handle(request(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"plex_search","arguments":{}}}"#,
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("query parameter is required"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_tool_error() {
        let server = test_server();
        let response = server
            .handle(request(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"plex_teleport"}}"#,
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_status_tool_reports_unreachable_bridge() {
        let server = test_server();
        let response = server
            .handle(request(
                r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"plex_status"}}"#,
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        let status: Value = serde_json::from_str(text).unwrap();
        assert_eq!(status["server"], false);
        assert_eq!(status["connected"], false);
    }
}
