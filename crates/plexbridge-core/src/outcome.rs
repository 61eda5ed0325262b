//! Terminal outcome taxonomy shared by the relay and both gateways.
//!
//! Every submitted query ends in exactly one [`QueryOutcome`]. Gateways
//! translate it into their own protocol (HTTP status family, MCP text
//! payload) but the taxonomy itself is defined once, here.

use serde::{Deserialize, Serialize};

/// The terminal result of one submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutcome {
    /// The peer completed the query and produced an answer.
    Answered(String),
    /// The query failed; the reason says which side gave up and why.
    Failed(FailureReason),
}

/// Why a query failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// No peer connected at submit time, or the send failed synchronously.
    PeerUnavailable,
    /// The peer explicitly reported that it could not complete the query.
    PeerReportedError(String),
    /// The deadline elapsed with no resolution.
    Timeout,
    /// The peer reply could not be parsed. Never delivered directly to a
    /// client; the affected request surfaces as its own later `Timeout`.
    MalformedPeerReply,
    /// Empty or missing query, rejected before any id was allocated.
    InvalidRequest,
}

impl FailureReason {
    /// Human-readable message for client-facing error payloads.
    pub fn message(&self) -> String {
        match self {
            Self::PeerUnavailable => {
                "Browser peer not connected. Open the browser and make sure the \
                 PlexBridge extension is running."
                    .to_string()
            }
            Self::PeerReportedError(msg) => msg.clone(),
            Self::Timeout => "Request timeout - peer did not respond".to_string(),
            Self::MalformedPeerReply => "Unparseable reply from peer".to_string(),
            Self::InvalidRequest => "Missing query parameter".to_string(),
        }
    }
}
