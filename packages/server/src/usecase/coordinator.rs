//! Coordinator（単一のアクター）
//!
//! SessionRegistry / RoomRegistry / MatchmakingQueue / MainStage / RoundState を
//! すべて所有し、`Command` を 1 つずつ最後まで処理します。ハンドラ間の排他は
//! このループの直列性だけで保証され、ロックは使いません。
//!
//! タイマーだけが再入の源になるため、発火時には必ず状態を再検証します
//! （`TimerScheduler::take_if_current` と各ハンドラでの存在確認）。

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use kupid_shared::{
    protocol::{ClientEvent, ServerEvent},
    time::Clock,
};
use tokio::sync::{mpsc, oneshot};

use crate::domain::{
    ConnectionId, MainStage, MatchmakingQueue, MessagePusher, PusherChannel, RoomId,
    RoomRegistry, RoundPrompt, RoundState, SessionRegistry, round,
};

use super::{
    error::CoordinatorError,
    query::{Query, RoomSnapshot},
    relay::RelayKind,
    timer::{TimerKey, TimerScheduler},
};

/// Coordinator の動作設定
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// メインステージに表示し続ける時間
    pub main_stage_duration: Duration,
    /// 1 セッションあたりのラウンド数
    pub rounds_per_session: usize,
    /// お題に時間の指定がない場合のラウンド時間（秒）
    pub round_base_duration_secs: u64,
    /// お題をシャッフルするか
    pub randomize_prompts: bool,
    /// 参加者が抜けるたびにキューからの再マッチングを試みるか
    pub promote_on_participant_leave: bool,
    /// お題のカタログ
    pub catalogue: Vec<RoundPrompt>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            main_stage_duration: Duration::from_secs(8 * 60),
            rounds_per_session: 3,
            round_base_duration_secs: 60,
            randomize_prompts: true,
            promote_on_participant_leave: false,
            catalogue: round::catalogue(),
        }
    }
}

/// Coordinator へのコマンド
#[derive(Debug)]
pub enum Command {
    /// WebSocket 接続が確立した
    Connected {
        connection: ConnectionId,
        sender: PusherChannel,
    },
    /// クライアントからイベントを受信した
    Inbound {
        connection: ConnectionId,
        event: ClientEvent,
    },
    /// WebSocket 接続が切れた
    Disconnected { connection: ConnectionId },
    /// タイマーが発火した
    TimerFired { key: TimerKey, token: u64 },
    /// 読み取り専用の問い合わせ（HTTP API 用）
    Query(Query),
    /// タイマーを全て止め、メインステージをクリアして終了する
    Shutdown,
}

/// Coordinator へコマンドを送るためのハンドル
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    fn send(&self, command: Command) -> Result<(), CoordinatorError> {
        self.commands
            .send(command)
            .map_err(|_| CoordinatorError::Unavailable)
    }

    pub fn connect(
        &self,
        connection: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(), CoordinatorError> {
        self.send(Command::Connected { connection, sender })
    }

    pub fn dispatch(
        &self,
        connection: ConnectionId,
        event: ClientEvent,
    ) -> Result<(), CoordinatorError> {
        self.send(Command::Inbound { connection, event })
    }

    pub fn disconnect(&self, connection: ConnectionId) -> Result<(), CoordinatorError> {
        self.send(Command::Disconnected { connection })
    }

    pub fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.send(Command::Shutdown)
    }

    /// アクティブなルームの一覧
    pub async fn rooms(&self) -> Result<Vec<RoomSnapshot>, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Query(Query::Rooms(tx)))?;
        rx.await.map_err(|_| CoordinatorError::Unavailable)
    }

    /// ルームの詳細（存在しなければ `None`）
    pub async fn room(&self, room_id: RoomId) -> Result<Option<RoomSnapshot>, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Query(Query::Room(room_id, tx)))?;
        rx.await.map_err(|_| CoordinatorError::Unavailable)
    }

    /// 現在のメインステージ
    pub async fn main_stage(&self) -> Result<MainStage, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Query(Query::MainStage(tx)))?;
        rx.await.map_err(|_| CoordinatorError::Unavailable)
    }
}

pub struct Coordinator {
    pub(super) config: CoordinatorConfig,
    pub(super) sessions: SessionRegistry,
    pub(super) rooms: RoomRegistry,
    pub(super) queue: MatchmakingQueue,
    pub(super) main_stage: MainStage,
    pub(super) rounds: HashMap<RoomId, RoundState>,
    /// ロビー（アクティブなルーム一覧・メインステージ）を購読している接続
    pub(super) lobby: HashSet<ConnectionId>,
    pub(super) timers: TimerScheduler,
    pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Coordinator {
    /// 新しい Coordinator と、そのハンドルを作成
    ///
    /// # Arguments
    ///
    /// * `config` - 動作設定
    /// * `pusher` - クライアントへの送信手段
    /// * `clock` - `endsAt` やチャットのタイムスタンプに使う時計
    pub fn new(
        config: CoordinatorConfig,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            config,
            sessions: SessionRegistry::new(),
            rooms: RoomRegistry::new(),
            queue: MatchmakingQueue::new(),
            main_stage: MainStage::default(),
            rounds: HashMap::new(),
            lobby: HashSet::new(),
            timers: TimerScheduler::new(tx.downgrade()),
            pusher,
            clock,
            commands: rx,
        };
        (coordinator, CoordinatorHandle { commands: tx })
    }

    /// Coordinator をバックグラウンドタスクとして起動
    pub fn spawn(
        config: CoordinatorConfig,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> (CoordinatorHandle, tokio::task::JoinHandle<()>) {
        let (coordinator, handle) = Self::new(config, pusher, clock);
        let task = tokio::spawn(coordinator.run());
        (handle, task)
    }

    /// コマンドループ
    ///
    /// 全てのハンドルが破棄されるか、`Shutdown` を受け取ると終了する。
    pub async fn run(mut self) {
        tracing::info!("Coordinator started");
        while let Some(command) = self.commands.recv().await {
            if let Command::Shutdown = command {
                break;
            }
            self.handle(command).await;
        }
        self.shutdown();
        tracing::info!("Coordinator stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Connected { connection, sender } => {
                tracing::debug!(%connection, "connection opened");
                self.pusher.register_client(connection, sender).await;
            }
            Command::Inbound { connection, event } => self.dispatch(connection, event).await,
            Command::Disconnected { connection } => self.handle_disconnect(&connection).await,
            Command::TimerFired { key, token } => self.handle_timer(key, token).await,
            Command::Query(query) => self.answer(query),
            Command::Shutdown => self.shutdown(),
        }
    }

    async fn dispatch(&mut self, connection: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::RegisterSession { session } => {
                self.register_session(&connection, session);
            }
            ClientEvent::JoinLobby => self.join_lobby(&connection).await,
            ClientEvent::LeaveLobby => self.leave_lobby(&connection),
            ClientEvent::GetMainStageStatus => self.send_main_stage_status(&connection).await,
            ClientEvent::CreateRoom { session, room_id } => {
                self.create_room(&connection, session, room_id).await;
            }
            ClientEvent::EnterMatchmakingQueue { session } => {
                self.enter_queue(&connection, session).await;
            }
            ClientEvent::LeaveMatchmakingQueue { session } => {
                self.leave_queue(&connection, session);
            }
            ClientEvent::JoinRoom { room_id, session } => {
                self.join_room(&connection, room_id, session).await;
            }
            ClientEvent::LeaveRoom { room_id } => {
                self.leave_room(&connection, room_id).await;
            }
            ClientEvent::GetRoomParticipants { room_id } => {
                self.send_room_participants(&connection, room_id).await;
            }
            ClientEvent::Offer {
                to_session,
                payload,
            } => {
                self.relay(&connection, RelayKind::Offer, to_session, payload)
                    .await;
            }
            ClientEvent::Answer {
                to_session,
                payload,
            } => {
                self.relay(&connection, RelayKind::Answer, to_session, payload)
                    .await;
            }
            ClientEvent::Candidate {
                to_session,
                payload,
            } => {
                self.relay(&connection, RelayKind::Candidate, to_session, payload)
                    .await;
            }
            ClientEvent::SendChatMessage {
                room_id,
                session,
                message,
            } => {
                self.send_chat(&connection, room_id, session, message)
                    .await;
            }
            ClientEvent::SendReaction { room_id, reaction } => {
                self.send_reaction(&connection, room_id, reaction).await;
            }
            ClientEvent::MediaState {
                room_id,
                session,
                muted,
                video_off,
            } => {
                self.update_media_state(&connection, room_id, session, muted, video_off)
                    .await;
            }
            ClientEvent::StartRounds { room_id } => self.start_rounds(&connection, room_id).await,
            ClientEvent::RestartRounds { room_id } => {
                self.restart_rounds(&connection, room_id).await;
            }
            ClientEvent::GetCurrentRound { room_id } => {
                self.send_current_round(&connection, room_id).await;
            }
        }
    }

    /// 接続が切れたときの後始末
    ///
    /// ルームからの退出 → キュー・ロビーからの削除 → 予約の解放 → セッションの登録解除 の順。
    async fn handle_disconnect(&mut self, connection: &ConnectionId) {
        self.leave_rooms(connection, None).await;
        if self.queue.remove_connection(connection) {
            tracing::debug!(%connection, "removed from matchmaking queue on disconnect");
        }
        self.lobby.remove(connection);
        self.rooms.release_reservations(connection);
        let session = self.sessions.forget(connection);
        self.pusher.unregister_client(connection).await;
        tracing::info!(%connection, session = ?session.as_ref().map(|s| s.as_str()), "connection closed");
    }

    async fn handle_timer(&mut self, key: TimerKey, token: u64) {
        if !self.timers.take_if_current(&key, token) {
            tracing::debug!(?key, token, "ignoring stale timer");
            return;
        }
        match key {
            TimerKey::MainStage => self.on_main_stage_expired().await,
            TimerKey::Round(room_id) => self.on_round_expired(room_id).await,
        }
    }

    fn shutdown(&mut self) {
        self.timers.cancel_all();
        self.rounds.clear();
        self.main_stage.clear();
        tracing::info!("Coordinator state cleared");
    }

    // ========================================
    // 共通ヘルパー
    // ========================================

    pub(super) fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// 1 つの接続に送信（失敗はログのみ）
    pub(super) async fn send(&self, connection: &ConnectionId, event: &ServerEvent) {
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize event: {}", e);
                return;
            }
        };
        if let Err(e) = self.pusher.push_to(connection, &json).await {
            tracing::debug!(%connection, "push failed: {}", e);
        }
    }

    /// 複数の接続に送信（ベストエフォート）
    pub(super) async fn broadcast(&self, targets: Vec<ConnectionId>, event: &ServerEvent) {
        if targets.is_empty() {
            return;
        }
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize event: {}", e);
                return;
            }
        };
        if let Err(e) = self.pusher.broadcast(targets, &json).await {
            tracing::warn!("broadcast failed: {}", e);
        }
    }

    /// ルームの全メンバーに送信
    pub(super) async fn broadcast_room(&self, room_id: &RoomId, event: &ServerEvent) {
        let targets = self
            .rooms
            .get(room_id)
            .map(|room| room.connections())
            .unwrap_or_default();
        self.broadcast(targets, event).await;
    }

    /// ロビーの購読者に送信
    pub(super) async fn broadcast_lobby(&self, event: &ServerEvent) {
        let mut targets: Vec<ConnectionId> = self.lobby.iter().cloned().collect();
        targets.sort();
        self.broadcast(targets, event).await;
    }
}
