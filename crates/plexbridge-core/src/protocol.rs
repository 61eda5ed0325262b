//! PlexBridge wire protocol.
//!
//! Two surfaces share these shapes: the peer WebSocket (JSON frames tagged
//! by `type`) and the HTTP API the gateways call. Field names stay
//! camelCase on the wire for compatibility with the browser-side peer.

use serde::{Deserialize, Serialize};

/// A frame on the peer WebSocket, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PeerFrame {
    /// Server -> Peer work item.
    #[serde(rename = "query")]
    Query {
        id: String,
        query: String,
        #[serde(rename = "newThread")]
        new_thread: bool,
    },

    /// Peer -> Server reply to a previously sent work item.
    #[serde(rename = "response")]
    Response {
        id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Peer -> Server liveness signal. Answered with a pong, never logged
    /// as peer traffic, never forwarded to the correlation table.
    #[serde(rename = "ping")]
    Ping,

    /// Server -> Peer liveness acknowledgment.
    #[serde(rename = "pong")]
    Pong,
}

/// `POST /ask` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
    #[serde(rename = "newThread", default)]
    pub new_thread: bool,
    /// Optional per-request deadline override, in milliseconds.
    #[serde(rename = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// `POST /ask` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /status` response body. Field names match the original bridge so
/// existing callers keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(rename = "extensionConnected")]
    pub peer_connected: bool,
}
