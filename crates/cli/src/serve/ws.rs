//! WebSocket endpoint: streamed analysis sessions.
//!
//! A client opens `/ws` and sends `start-analysis` messages; each one
//! spawns an independent session whose progress events come back over
//! the same socket as `analysis-update` messages followed by exactly one
//! `analysis-complete` or `analysis-error`. Events from concurrent
//! sessions interleave in emission order. A client that disconnects
//! mid-analysis does not abort the session; its remaining events are
//! simply dropped.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use spillway_pipeline::{
    run_session, today_utc, AnalysisEvent, AnalysisResults, PipelineConfig, SessionEnv,
};

use super::AppState;

/// Messages a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientMessage {
    StartAnalysis {
        #[serde(rename = "damName")]
        dam_name: String,
    },
}

/// Messages the server sends.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ServerMessage {
    AnalysisUpdate { stage: u8, message: String },
    AnalysisComplete { results: Box<AnalysisResults> },
    AnalysisError { message: String },
}

impl From<AnalysisEvent> for ServerMessage {
    fn from(event: AnalysisEvent) -> Self {
        match event {
            AnalysisEvent::Update(update) => ServerMessage::AnalysisUpdate {
                stage: update.stage,
                message: update.message,
            },
            AnalysisEvent::Complete(results) => ServerMessage::AnalysisComplete { results },
            AnalysisEvent::Error { message } => ServerMessage::AnalysisError { message },
        }
    }
}

/// GET /ws
pub(crate) async fn handle_ws_upgrade(
    State(state): State<Arc<AppState>>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection loop: forward session events out, accept new requests in.
///
/// All sessions started on this socket share one event channel, so a
/// single writer owns the socket and event order is preserved.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<AnalysisEvent>();

    loop {
        tokio::select! {
            event = rx.recv() => {
                // `tx` is held in this scope, so the channel cannot close.
                let Some(event) = event else { break };
                match serde_json::to_string(&ServerMessage::from(event)) {
                    Ok(json) => {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break; // client gone
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "failed to encode ws message"),
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_client_text(&text, &state, &tx),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary: ignore
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "ws receive error");
                        break;
                    }
                }
            }
        }
    }
}

fn handle_client_text(text: &str, state: &Arc<AppState>, tx: &mpsc::UnboundedSender<AnalysisEvent>) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::StartAnalysis { dam_name }) => {
            let state = Arc::clone(state);
            let tx = tx.clone();
            tokio::spawn(async move {
                let env = SessionEnv {
                    geocoder: state.geocoder.as_ref(),
                    oracle: state.oracle.as_ref(),
                    store: state.store.as_ref(),
                    registry: &state.registry,
                    config: PipelineConfig::for_today(today_utc()),
                };
                // The session emits its own terminal event over `tx`.
                let _ = run_session(&env, &tx, &dam_name).await;
            });
        }
        Err(e) => {
            let _ = tx.send(AnalysisEvent::Error {
                message: format!("Invalid request: {}", e),
            });
        }
    }
}
