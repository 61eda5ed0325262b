//! Axum HTTP + WebSocket server.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;

use plexbridge_core::outcome::{FailureReason, QueryOutcome};
use plexbridge_core::protocol::{AskRequest, AskResponse, StatusResponse};

use crate::connection::handle_peer_connection;
use crate::state::BridgeState;

/// Start the bridge server.
pub async fn start_server(state: Arc<BridgeState>, port: u16) -> anyhow::Result<()> {
    let bind_addr = state.config.server_bind();

    let app = Router::new()
        .route("/ask", post(ask_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        // The CLI and browser peer may call from any origin.
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{bind_addr}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Bridge listening on {addr}");
    info!("HTTP endpoint: http://{addr}/ask");
    info!("Peer WebSocket: ws://{addr}/ws");
    info!("Waiting for browser peer to connect...");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<BridgeState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_peer_connection(state, socket))
}

async fn ask_handler(
    State(state): State<Arc<BridgeState>>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> (StatusCode, Json<AskResponse>) {
    let Json(req) = match body {
        Ok(body) => body,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AskResponse {
                    success: false,
                    answer: None,
                    error: Some("Invalid JSON body".to_string()),
                }),
            );
        }
    };

    let timeout = req.timeout_ms.map(Duration::from_millis);
    let outcome = state.relay.submit(&req.query, req.new_thread, timeout).await;
    outcome_to_response(outcome)
}

/// Translate a terminal outcome into the HTTP status family and body.
fn outcome_to_response(outcome: QueryOutcome) -> (StatusCode, Json<AskResponse>) {
    match outcome {
        QueryOutcome::Answered(answer) => (
            StatusCode::OK,
            Json(AskResponse {
                success: true,
                answer: Some(answer),
                error: None,
            }),
        ),
        QueryOutcome::Failed(reason) => {
            let status = match reason {
                FailureReason::InvalidRequest => StatusCode::BAD_REQUEST,
                FailureReason::PeerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                FailureReason::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FailureReason::PeerReportedError(_) | FailureReason::MalformedPeerReply => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (
                status,
                Json(AskResponse {
                    success: false,
                    answer: None,
                    error: Some(reason.message()),
                }),
            )
        }
    }
}

async fn status_handler(State(state): State<Arc<BridgeState>>) -> Json<StatusResponse> {
    let status = state.relay.status().await;
    Json(StatusResponse {
        status: "running".to_string(),
        peer_connected: status.peer_connected,
    })
}

async fn health_handler(State(state): State<Arc<BridgeState>>) -> impl IntoResponse {
    let status = state.relay.status().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "peer_connected": status.peer_connected,
        "pending": state.relay.pending_count(),
    }))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_status_mapping() {
        let (status, _) = outcome_to_response(QueryOutcome::Answered("Paris".into()));
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            outcome_to_response(QueryOutcome::Failed(FailureReason::PeerUnavailable));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = outcome_to_response(QueryOutcome::Failed(FailureReason::Timeout));
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        let (status, _) =
            outcome_to_response(QueryOutcome::Failed(FailureReason::InvalidRequest));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = outcome_to_response(QueryOutcome::Failed(
            FailureReason::PeerReportedError("boom".into()),
        ));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.as_deref(), Some("boom"));
    }
}
