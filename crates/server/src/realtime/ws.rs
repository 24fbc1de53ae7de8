//! WebSocket endpoint.
//!
//! Each connection registers with the broadcaster on upgrade, then a
//! single task pumps frames in both directions: published events flow out,
//! and the client's identity declaration flows in. A stalled peer stalls
//! only its own connection, never the dispatcher.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use tradepost_core::UserId;

use crate::state::AppState;

/// Messages a client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "event")]
enum ClientMessage {
    /// The client declares which user it belongs to, scoping it into that
    /// user's connection set for per-user events.
    #[serde(rename = "join", rename_all = "camelCase")]
    Join { user_id: i32 },
}

/// WebSocket upgrade handler for `GET /ws`.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection_id = state.broadcaster().register(tx);

    tracing::info!(
        %connection_id,
        connections = state.broadcaster().connection_count(),
        "WebSocket connected"
    );

    loop {
        tokio::select! {
            // Incoming messages from the client
            Some(msg) = ws_rx.next() => {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Join { user_id }) => {
                                let user_id = UserId::new(user_id);
                                state.broadcaster().identify(connection_id, user_id);
                                tracing::debug!(%connection_id, %user_id, "Connection identified");
                            }
                            Err(e) => {
                                tracing::debug!(%connection_id, error = %e, "Unrecognized client message");
                            }
                        }
                    }
                    Ok(Message::Ping(data)) => {
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::debug!(%connection_id, "Client requested close");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%connection_id, error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }

            // Published events destined for this connection
            maybe_frame = rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            else => break,
        }
    }

    state.broadcaster().unregister(connection_id);
    tracing::info!(%connection_id, "WebSocket disconnected");
}
