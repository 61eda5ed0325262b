//! Relay core: matches client submissions to peer work items and peer
//! replies back to the waiting clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use plexbridge_core::config::Config;
use plexbridge_core::outcome::{FailureReason, QueryOutcome};
use plexbridge_core::protocol::PeerFrame;

use crate::peer::PeerSlot;
use crate::pending::PendingTable;

/// Non-blocking snapshot of the bridge, for `/status`.
#[derive(Debug, Clone, Copy)]
pub struct BridgeStatus {
    pub peer_connected: bool,
}

/// The orchestrator between client gateways and the peer session.
pub struct RelayCore {
    pending: Arc<PendingTable>,
    peer: PeerSlot,
    default_timeout: Duration,
    max_timeout: Duration,
}

impl RelayCore {
    pub fn new(config: &Config) -> Self {
        Self {
            pending: PendingTable::new(),
            peer: PeerSlot::new(),
            default_timeout: Duration::from_millis(config.ask_timeout_ms()),
            max_timeout: Duration::from_millis(config.max_ask_timeout_ms()),
        }
    }

    /// Submit a query and wait for its terminal outcome.
    ///
    /// Suspends the caller until the peer replies or the deadline fires.
    /// Rejections (empty query, no peer) happen before any id is allocated
    /// or timer started.
    pub async fn submit(
        &self,
        query: &str,
        new_thread: bool,
        timeout: Option<Duration>,
    ) -> QueryOutcome {
        let query = query.trim();
        if query.is_empty() {
            return QueryOutcome::Failed(FailureReason::InvalidRequest);
        }

        if !self.peer.is_connected().await {
            return QueryOutcome::Failed(FailureReason::PeerUnavailable);
        }

        let timeout = timeout
            .unwrap_or(self.default_timeout)
            .min(self.max_timeout);

        let id = Uuid::new_v4().to_string();
        let (responder, receiver) = oneshot::channel();
        if !self.pending.register(&id, responder, timeout) {
            // Fresh uuid collided with a pending id; practically unreachable.
            return QueryOutcome::Failed(FailureReason::InvalidRequest);
        }

        debug!(%id, new_thread, "Forwarding query to peer");
        let frame = PeerFrame::Query {
            id: id.clone(),
            query: query.to_string(),
            new_thread,
        };
        if self.peer.send(&frame).await.is_err() {
            // Peer vanished between the connectivity check and the send;
            // fail the request now instead of letting it age out.
            self.pending
                .resolve(&id, QueryOutcome::Failed(FailureReason::PeerUnavailable));
        }

        // A dropped responder would mean an entry left the table without
        // being resolved; map it to a timeout so the caller still gets a
        // terminal outcome.
        receiver
            .await
            .unwrap_or(QueryOutcome::Failed(FailureReason::Timeout))
    }

    /// Snapshot of peer connectivity. Never waits on pending work.
    pub async fn status(&self) -> BridgeStatus {
        BridgeStatus {
            peer_connected: self.peer.is_connected().await,
        }
    }

    /// Number of requests currently in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Install a newly connected peer socket; returns its generation.
    pub async fn peer_connected(&self, tx: mpsc::UnboundedSender<String>) -> u64 {
        self.peer.connect(tx).await
    }

    /// Note a peer socket going away. Pending requests are left to their
    /// own deadlines; a quick reconnect may still answer them in other
    /// designs, and failing them here would make every blip fatal.
    pub async fn peer_disconnected(&self, generation: u64) {
        self.peer.disconnect(generation).await;
    }

    /// Handle a response frame from the peer.
    pub fn resolve_from_peer(
        &self,
        id: &str,
        success: bool,
        answer: Option<String>,
        error: Option<String>,
    ) {
        let outcome = if success {
            QueryOutcome::Answered(answer.unwrap_or_default())
        } else {
            QueryOutcome::Failed(FailureReason::PeerReportedError(
                error.unwrap_or_else(|| "Unknown error from peer".to_string()),
            ))
        };

        if !self.pending.resolve(id, outcome) {
            // Already resolved or timed out; late replies are dropped.
            warn!(%id, "Peer reply for unknown request id, dropping");
        }
    }
}
