//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It initializes the chat connection and drives one exchange per submission.

use crate::web::{
    chat_task::chat_exchange,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, ChatConnection},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use quiz_review_core::ports::PortError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (mut sender, mut receiver) = socket.split();

    // All protocol events flow through this channel; a forwarding task owns
    // the socket sink so the exchange worker never touches the transport.
    let (events_tx, mut events_rx) = mpsc::channel::<ServerMessage>(32);
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = events_rx.recv().await {
            let json = serde_json::to_string(&msg).unwrap();
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // --- 1. Initialization Phase ---
    let connection = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(&init_json) {
                Ok(ClientMessage::Init { user_id, quiz_id }) => {
                    match ChatConnection::new(app_state.clone(), &user_id, &quiz_id).await {
                        Ok(connection) => {
                            info!(
                                connection_id = %connection.connection_id,
                                user_id = %connection.user_id,
                                quiz_id = %quiz_id,
                                "Chat session initialized."
                            );
                            let _ = events_tx
                                .send(ServerMessage::SessionInitialized { quiz_id })
                                .await;
                            connection
                        }
                        Err(e) => {
                            // Absent user, quiz, or attempt denies the session.
                            let message = match e {
                                PortError::NotFound(_) => {
                                    "Quiz attempt data not found.".to_string()
                                }
                                PortError::Unexpected(_) => {
                                    "Failed to load quiz attempt data.".to_string()
                                }
                            };
                            error!("Failed to initialize chat connection: {}", e);
                            let _ = events_tx.send(ServerMessage::Error { message }).await;
                            drop(events_tx);
                            forward_task.await.ok();
                            return;
                        }
                    }
                }
                _ => {
                    error!("First message was not a valid Init message.");
                    return;
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    // --- 2. Main Message Loop ---
    // Each submission runs as its own task so the socket stays responsive
    // while a reply streams; the session's idle-only rule silently rejects
    // submissions that arrive while a stream is in flight.
    let mut exchange_task: Option<tokio::task::JoinHandle<()>> = None;
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Chat { text }) => {
                    let session = connection.session.clone();
                    let completion = app_state.completion.clone();
                    let events = events_tx.clone();
                    let token = connection.cancellation_token.clone();
                    let reply_timeout = app_state.config.reply_timeout;
                    exchange_task = Some(tokio::spawn(async move {
                        chat_exchange(session, completion, text, events, token, reply_timeout)
                            .await;
                    }));
                }
                Ok(ClientMessage::Init { .. }) => {
                    warn!("Received subsequent Init message, which is ignored.");
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    // Cancelling the token lets an in-flight exchange close its turn instead
    // of waiting out a stalled provider.
    connection.cancellation_token.cancel();
    if let Some(task) = exchange_task {
        task.await.ok();
    }
    drop(events_tx);
    forward_task.await.ok();
    info!(
        connection_id = %connection.connection_id,
        "WebSocket connection closed."
    );
}
