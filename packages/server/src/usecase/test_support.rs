//! Coordinator のテスト用ハーネス
//!
//! 実際の `WebSocketMessagePusher` とチャンネルで Coordinator を起動し、
//! 接続ごとに受信したイベントを `ServerEvent` として読み出せるようにする。

use std::{collections::HashMap, sync::Arc};

use kupid_shared::{
    protocol::{ClientEvent, ServerEvent},
    time::FixedClock,
};
use tokio::sync::{Mutex, mpsc};

use crate::{domain::ConnectionId, infrastructure::message_pusher::WebSocketMessagePusher};

use super::coordinator::{Coordinator, CoordinatorConfig, CoordinatorHandle};

/// テストで使う固定時刻（Unix milliseconds）
pub(crate) const NOW: i64 = 1_700_000_000_000;

/// お題をシャッフルしない設定
pub(crate) fn test_config() -> CoordinatorConfig {
    CoordinatorConfig {
        randomize_prompts: false,
        ..CoordinatorConfig::default()
    }
}

pub(crate) struct TestHarness {
    pub handle: CoordinatorHandle,
}

impl TestHarness {
    pub fn start() -> Self {
        Self::start_with(test_config())
    }

    pub fn start_with(config: CoordinatorConfig) -> Self {
        let pusher = Arc::new(WebSocketMessagePusher::new(Arc::new(Mutex::new(
            HashMap::new(),
        ))));
        let clock = Arc::new(FixedClock::new(NOW));
        let (handle, _task) = Coordinator::spawn(config, pusher, clock);
        Self { handle }
    }

    pub fn connect(&self, name: &str) -> TestClient {
        let connection = ConnectionId::new(name);
        let (tx, rx) = mpsc::unbounded_channel();
        self.handle.connect(connection.clone(), tx).unwrap();
        TestClient {
            connection,
            rx,
            handle: self.handle.clone(),
        }
    }
}

pub(crate) struct TestClient {
    pub connection: ConnectionId,
    rx: mpsc::UnboundedReceiver<String>,
    handle: CoordinatorHandle,
}

impl TestClient {
    pub fn send(&self, event: ClientEvent) {
        self.handle
            .dispatch(self.connection.clone(), event)
            .unwrap();
    }

    pub fn join(&self, room_id: &str, session: &str) {
        self.send(ClientEvent::JoinRoom {
            room_id: room_id.to_string(),
            session: session.to_string(),
        });
    }

    pub fn disconnect(&self) {
        self.handle.disconnect(self.connection.clone()).unwrap();
    }

    /// 次のイベントを待つ
    pub async fn recv(&mut self) -> ServerEvent {
        let text = self.rx.recv().await.expect("connection channel closed");
        ServerEvent::from_json(&text).unwrap()
    }

    /// 条件に合うイベントが来るまで読み飛ばす
    pub async fn recv_until(&mut self, predicate: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
        loop {
            let event = self.recv().await;
            if predicate(&event) {
                return event;
            }
        }
    }

    /// それまでに送られたコマンドの処理完了を待ってから、届いているイベントを全て取り出す
    pub async fn drain(&mut self) -> Vec<ServerEvent> {
        self.handle.main_stage().await.unwrap();
        let mut events = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            events.push(ServerEvent::from_json(&text).unwrap());
        }
        events
    }
}
