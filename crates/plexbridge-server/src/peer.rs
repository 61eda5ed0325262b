//! The single browser peer session.
//!
//! Exactly one peer is meaningful at a time. `PeerSlot` is the one shared
//! mutable cell holding the current session; a new connection replaces the
//! old one atomically, and each session carries a generation counter so a
//! superseded socket's close cannot clear its replacement.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

use plexbridge_core::protocol::PeerFrame;

/// A live connection to the browser peer: the sender feeding its socket
/// write task, tagged with the generation it was created under.
pub struct PeerSession {
    pub generation: u64,
    tx: mpsc::UnboundedSender<String>,
}

impl PeerSession {
    /// Serialize and enqueue a frame for the peer. Fails if the write task
    /// has already shut down.
    pub fn send(&self, frame: &PeerFrame) -> Result<(), PeerSendError> {
        let text = serde_json::to_string(frame).map_err(|_| PeerSendError)?;
        self.tx.send(text).map_err(|_| PeerSendError)
    }
}

/// The peer is gone or its outbound channel is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerSendError;

/// Holder of the current peer session.
#[derive(Default)]
pub struct PeerSlot {
    current: RwLock<Option<PeerSession>>,
    next_generation: AtomicU64,
}

impl PeerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new peer session, displacing any previous one. Returns the
    /// new session's generation.
    ///
    /// The displaced session's outstanding requests are not touched; they
    /// resolve via their own deadlines.
    pub async fn connect(&self, tx: mpsc::UnboundedSender<String>) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut current = self.current.write().await;
        if let Some(old) = current.as_ref() {
            info!(
                old_generation = old.generation,
                new_generation = generation,
                "Peer reconnected, replacing previous session"
            );
        } else {
            info!(generation, "Peer connected");
        }
        *current = Some(PeerSession { generation, tx });
        generation
    }

    /// Clear the slot, but only if the disconnecting socket still owns it.
    /// Returns whether the slot was cleared.
    pub async fn disconnect(&self, generation: u64) -> bool {
        let mut current = self.current.write().await;
        match current.as_ref() {
            Some(session) if session.generation == generation => {
                *current = None;
                info!(generation, "Peer disconnected");
                true
            }
            _ => {
                debug!(generation, "Stale peer disconnect ignored");
                false
            }
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Send a frame to the current peer, if any.
    pub async fn send(&self, frame: &PeerFrame) -> Result<(), PeerSendError> {
        let current = self.current.read().await;
        match current.as_ref() {
            Some(session) => session.send(frame),
            None => Err(PeerSendError),
        }
    }
}
