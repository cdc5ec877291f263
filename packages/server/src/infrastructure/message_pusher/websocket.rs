//! ソケット単位の配送
//!
//! 1 本の WebSocket 接続につき 1 つの `ConnectionId` と 1 本のチャネルを持つ。
//! Coordinator が宛先の接続を決め、イベントを JSON 文字列にしてから渡すので、
//! ここはその文字列を該当ソケットの書き込みタスク（`ui/handler/websocket.rs`）へ
//! 流すだけになる。
//!
//! - 同じセッションが再接続すると新しい `ConnectionId` になる。古いソケット宛ての
//!   送信は `ClientNotFound` になり、新しいソケットには届かない
//! - 1 つの接続への送信順は Coordinator が呼んだ順序のまま
//! - 切断時は UI 層が `unregister_client` を呼ぶ

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// `ConnectionId` → 書き込みタスクのチャネル
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new(Arc::new(Mutex::new(HashMap::new())));
///
/// pusher.register_client(connection.clone(), tx).await;
/// pusher.push_to(&connection, "{\"type\":\"user-joined\",\"session\":\"S2\"}").await?;
/// ```
pub struct WebSocketMessagePusher {
    /// 登録中のソケットごとの書き込みチャネル
    clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    /// # 引数
    ///
    /// - `clients`: ConnectionId ごとの書き込みチャネル
    pub fn new(clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>) -> Self {
        Self { clients }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(HashMap::new())))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        tracing::debug!("Connection '{}' registered to MessagePusher", connection);
        clients.insert(connection, sender);
    }

    async fn unregister_client(&self, connection: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(connection);
        tracing::debug!("Connection '{}' unregistered from MessagePusher", connection);
    }

    async fn push_to(
        &self,
        connection: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        if let Some(sender) = clients.get(connection) {
            sender
                .send(content.to_string())
                .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
            tracing::debug!("Pushed message to connection '{}'", connection);
            Ok(())
        } else {
            Err(MessagePushError::ClientNotFound(connection.to_string()))
        }
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        for target in targets {
            if let Some(sender) = clients.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                if let Err(e) = sender.send(content.to_string()) {
                    tracing::warn!("Failed to push message to connection '{}': {}", target, e);
                }
            } else {
                tracing::debug!("Connection '{}' not found during broadcast, skipping", target);
            }
        }

        Ok(())
    }
}
