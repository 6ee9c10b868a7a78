//! WebSocket handler for the answer channel.
//!
//! The `/ws/answer` endpoint upgrades an HTTP connection to a WebSocket.
//! Each connection owns one [`RelaySession`]; inbound text frames carrying
//! `{"question": ...}` start a generation, and every relay reply goes back
//! as a JSON text frame. When the socket closes, the session's disconnect
//! path cancels whatever is in flight.
//!
//! Uses `tokio::select!` to multiplex between relay replies and incoming
//! WebSocket messages, keeping both directions in a single task.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use askbridge_core::relay::RelaySession;
use askbridge_types::channel::QuestionMessage;

use crate::state::AppState;

/// Upgrade an HTTP request to a WebSocket answer channel.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Core WebSocket connection handler.
async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (reply_tx, mut reply_rx) = mpsc::channel(32);
    let mut session = RelaySession::new(state.resolver.clone(), reply_tx);

    loop {
        tokio::select! {
            // --- Branch 1: Forward relay replies to the client ---
            reply = reply_rx.recv() => {
                match reply {
                    Some(reply) => {
                        let json = reply.into_value().to_string();
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            // Client disconnected
                            break;
                        }
                    }
                    // Session dropped its sender (cannot happen while the
                    // session is alive, but ends the loop cleanly if it does)
                    None => break,
                }
            }

            // --- Branch 2: Process inbound frames from the client ---
            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<QuestionMessage>(&text) {
                            Ok(msg) => session.handle_question(msg.question),
                            Err(err) => {
                                tracing::warn!(
                                    raw = %text,
                                    error = %err,
                                    "ignoring malformed channel message"
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        // Client disconnected
                        break;
                    }
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    // Ignore binary, ping, pong protocol frames (handled by axum/tungstenite)
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // The only cancellation trigger: flips the request token and fires the
    // provider's release hook.
    session.disconnect();
    tracing::debug!("answer channel closed");
}
