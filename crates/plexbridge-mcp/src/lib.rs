//! MCP server for PlexBridge.
//!
//! Implements JSON-RPC 2.0 over stdio (the standard MCP transport) and
//! exposes three tools: `plex_search`, `plex_followup`, and `plex_status`.
//! Tool calls are forwarded to the bridge server over HTTP.

pub mod bridge;
pub mod protocol;
pub mod server;

pub use bridge::BridgeClient;
pub use server::McpServer;
