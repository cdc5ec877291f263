//! Integration tests: the real Axum server on an ephemeral port, driven over
//! WebSocket (tokio-tungstenite) and HTTP (reqwest).

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use kupid_server::{
    infrastructure::{
        dto::http::{MainStageDto, RoomDetailDto, RoomSummaryDto},
        message_pusher::WebSocketMessagePusher,
    },
    ui::Server,
    usecase::{Coordinator, CoordinatorConfig},
};
use kupid_shared::{
    protocol::{ClientEvent, ServerEvent, SessionDescription},
    time::SystemClock,
};
use tokio::{net::TcpStream, sync::oneshot};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Helper struct to manage the in-process server lifecycle
struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let config = CoordinatorConfig {
            randomize_prompts: false,
            ..CoordinatorConfig::default()
        };
        let (coordinator, _task) = Coordinator::spawn(
            config,
            Arc::new(WebSocketMessagePusher::default()),
            Arc::new(SystemClock),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            Server::new(coordinator)
                .serve(listener, shutdown)
                .await
                .unwrap();
        });

        TestServer {
            addr,
            shutdown: Some(tx),
        }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Helper struct wrapping a raw WebSocket connection
struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(server: &TestServer) -> Self {
        let (ws, _) = connect_async(server.ws_url()).await.unwrap();
        TestClient { ws }
    }

    async fn send(&mut self, event: ClientEvent) {
        let json = event.to_json().unwrap();
        self.ws.send(Message::Text(json.into())).await.unwrap();
    }

    async fn join(&mut self, room_id: &str, session: &str) {
        self.send(ClientEvent::RegisterSession {
            session: session.to_string(),
        })
        .await;
        self.send(ClientEvent::JoinRoom {
            room_id: room_id.to_string(),
            session: session.to_string(),
        })
        .await;
    }

    /// Read events until one matches `pred`, skipping the rest
    async fn recv_until<F>(&mut self, pred: F) -> ServerEvent
    where
        F: Fn(&ServerEvent) -> bool,
    {
        tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                let msg = self.ws.next().await.unwrap().unwrap();
                if let Message::Text(text) = msg {
                    let event = ServerEvent::from_json(text.as_str()).unwrap();
                    if pred(&event) {
                        return event;
                    }
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    async fn close(mut self) {
        self.ws.close(None).await.unwrap();
    }
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let body: serde_json::Value = reqwest::get(server.http_url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_two_participants_meet_and_relay_offer() {
    // テスト項目: 2 人目の参加者に既存参加者が通知され、offer が中継される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = TestClient::connect(&server).await;
    let mut bob = TestClient::connect(&server).await;
    alice.join("room-1", "S1").await;
    alice
        .recv_until(|e| matches!(e, ServerEvent::ExistingParticipants { .. }))
        .await;

    // when (操作):
    bob.join("room-1", "S2").await;

    // then (期待する結果):
    let existing = bob
        .recv_until(|e| matches!(e, ServerEvent::ExistingParticipants { .. }))
        .await;
    assert_eq!(
        existing,
        ServerEvent::ExistingParticipants {
            participant_sessions: vec!["S1".to_string()]
        }
    );
    let joined = alice
        .recv_until(|e| matches!(e, ServerEvent::UserJoined { .. }))
        .await;
    assert_eq!(
        joined,
        ServerEvent::UserJoined {
            session: "S2".to_string()
        }
    );

    // 参加した側（S2）が offer を送る
    let offer = serde_json::to_value(SessionDescription::offer("v=0")).unwrap();
    bob.send(ClientEvent::Offer {
        to_session: "S1".to_string(),
        payload: offer.clone(),
    })
    .await;
    let relayed = alice
        .recv_until(|e| matches!(e, ServerEvent::Offer { .. }))
        .await;
    assert_eq!(
        relayed,
        ServerEvent::Offer {
            from_session: "S2".to_string(),
            payload: offer
        }
    );
}

#[tokio::test]
async fn test_full_room_is_featured_and_listed() {
    // テスト項目: 2 人揃ったルームがメインステージに出て、HTTP API から見える
    // given (前提条件):
    let server = TestServer::start().await;
    let mut watcher = TestClient::connect(&server).await;
    let mut alice = TestClient::connect(&server).await;
    let mut bob = TestClient::connect(&server).await;
    watcher.send(ClientEvent::JoinLobby).await;
    watcher
        .recv_until(|e| matches!(e, ServerEvent::MainStageStatus(_)))
        .await;
    alice.join("room-2", "S1").await;
    alice
        .recv_until(|e| matches!(e, ServerEvent::ExistingParticipants { .. }))
        .await;

    // when (操作):
    bob.join("room-2", "S2").await;

    // then (期待する結果):
    let update = watcher
        .recv_until(|e| matches!(e, ServerEvent::MainStageUpdate(_)))
        .await;
    let ServerEvent::MainStageUpdate(payload) = update else {
        unreachable!();
    };
    assert_eq!(payload.room_id.as_deref(), Some("room-2"));

    let rooms: Vec<RoomSummaryDto> = reqwest::get(server.http_url("/api/rooms"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_id, "room-2");
    assert_eq!(rooms[0].participants, vec!["S1", "S2"]);
    assert!(rooms[0].featured);

    let detail: RoomDetailDto = reqwest::get(server.http_url("/api/rooms/room-2"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.viewer_count, 2);

    let stage: MainStageDto = reqwest::get(server.http_url("/api/main-stage"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stage.room_id.as_deref(), Some("room-2"));
    assert!(stage.ends_at.is_some());
}

#[tokio::test]
async fn test_unknown_room_returns_404() {
    // テスト項目: 存在しないルームの詳細は 404 になる
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let response = reqwest::get(server.http_url("/api/rooms/nope"))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disconnect_notifies_user_left() {
    // テスト項目: ソケットが閉じると残りの参加者に user-left が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = TestClient::connect(&server).await;
    let mut bob = TestClient::connect(&server).await;
    alice.join("room-3", "S1").await;
    alice
        .recv_until(|e| matches!(e, ServerEvent::ExistingParticipants { .. }))
        .await;
    bob.join("room-3", "S2").await;
    alice
        .recv_until(|e| matches!(e, ServerEvent::UserJoined { .. }))
        .await;

    // when (操作):
    bob.close().await;

    // then (期待する結果):
    let left = alice
        .recv_until(|e| matches!(e, ServerEvent::UserLeft { .. }))
        .await;
    assert_eq!(
        left,
        ServerEvent::UserLeft {
            session: "S2".to_string()
        }
    );
}

#[tokio::test]
async fn test_malformed_message_keeps_connection_open() {
    // テスト項目: 不正な JSON を送っても接続は切れず、後続のイベントが処理される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = TestClient::connect(&server).await;

    // when (操作):
    alice
        .ws
        .send(Message::Text("not json".into()))
        .await
        .unwrap();
    alice.join("room-4", "S1").await;

    // then (期待する結果):
    let existing = alice
        .recv_until(|e| matches!(e, ServerEvent::ExistingParticipants { .. }))
        .await;
    assert_eq!(
        existing,
        ServerEvent::ExistingParticipants {
            participant_sessions: vec![]
        }
    );
}
