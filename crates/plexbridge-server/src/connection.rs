//! Peer WebSocket connection lifecycle — read/write loops and frame
//! filtering.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use plexbridge_core::protocol::PeerFrame;

use crate::state::BridgeState;

/// Handle a newly upgraded peer WebSocket.
///
/// Installs the socket as the current peer session (displacing any
/// previous one), then pumps frames until the socket closes. Liveness
/// pings are answered here and never reach the relay.
pub async fn handle_peer_connection(state: Arc<BridgeState>, ws: WebSocket) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    // Outbound channel: the relay and the ping handler both feed this.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let generation = state.relay.peer_connected(tx.clone()).await;

    // Writer task owns the socket sink.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Main read loop
    while let Some(msg_result) = ws_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let text = text.to_string();
                match serde_json::from_str::<PeerFrame>(&text) {
                    Ok(PeerFrame::Ping) => {
                        // Liveness only: acknowledge and stay quiet.
                        if let Ok(pong) = serde_json::to_string(&PeerFrame::Pong) {
                            let _ = tx.send(pong);
                        }
                    }
                    Ok(PeerFrame::Response { id, success, answer, error }) => {
                        debug!(%id, success, "Received peer reply");
                        state.relay.resolve_from_peer(&id, success, answer, error);
                    }
                    Ok(other) => {
                        debug!(?other, "Ignoring unexpected peer frame");
                    }
                    Err(e) => {
                        // Malformed replies are dropped whole: no id to
                        // fail, so the affected caller times out later.
                        warn!(%e, "Dropping malformed peer frame");
                    }
                }
            }
            Ok(Message::Ping(_)) => {
                // Axum answers transport-level pings automatically.
            }
            Ok(Message::Close(_)) => {
                debug!(generation, "Peer requested close");
                break;
            }
            Err(e) => {
                error!(generation, %e, "Peer WebSocket error");
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    state.relay.peer_disconnected(generation).await;
    info!(generation, "Peer connection closed");
}
