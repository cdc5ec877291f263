//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use kupid_shared::protocol::ClientEvent;
use tokio::sync::mpsc;

use crate::{domain::ConnectionId, ui::state::AppState};

/// `GET /ws`
///
/// セッション ID はイベントのペイロードで届くため、接続時には何も検証しない。
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// # Arguments
///
/// * `rx` - Channel receiver fed by the coordinator's MessagePusher
/// * `sender` - WebSocket sink to send messages to this connection
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection = ConnectionId::generate();
    let (tx, rx) = mpsc::unbounded_channel();

    if state.coordinator.connect(connection.clone(), tx).is_err() {
        tracing::error!(%connection, "Coordinator is not running, closing socket");
        return;
    }
    tracing::info!(%connection, "WebSocket connected");

    let (sender, mut receiver) = socket.split();

    let coordinator = state.coordinator.clone();
    let recv_connection = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(connection = %recv_connection, "WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!(connection = %recv_connection, "Received: {}", text.as_str());
                    let event = match ClientEvent::from_json(text.as_str()) {
                        Ok(event) => event,
                        Err(e) => {
                            // 不正なメッセージは無視して接続は維持する
                            tracing::warn!(
                                connection = %recv_connection,
                                "Failed to parse client event: {}",
                                e
                            );
                            continue;
                        }
                    };
                    if coordinator.dispatch(recv_connection.clone(), event).is_err() {
                        break;
                    }
                }
                Message::Ping(_) => {
                    tracing::trace!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!(connection = %recv_connection, "Client requested close");
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if state.coordinator.disconnect(connection.clone()).is_err() {
        tracing::debug!(%connection, "Coordinator already stopped");
    }
    tracing::info!(%connection, "WebSocket disconnected");
}
