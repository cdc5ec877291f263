//! UseCase: セッション登録・ロビー・ルーム作成
//!
//! - `register-session`: 接続とセッション ID を対応付ける
//! - `join-lobby` / `leave-lobby`: アクティブなルーム一覧とメインステージの購読
//! - `create-room`: ルーム ID の予約（実体は最初の `join-room` で作られる）

use kupid_shared::protocol::{MainStagePayload, RoomSummaryPayload, ServerEvent};

use crate::domain::{ConnectionId, RoomId, SessionId, room_registry::ReserveError};

use super::coordinator::Coordinator;

const ROOM_ALREADY_EXISTS: &str = "Room already exists";

impl Coordinator {
    pub(super) fn register_session(&mut self, connection: &ConnectionId, session: String) {
        match SessionId::try_from(session) {
            Ok(session) => {
                tracing::info!(%connection, %session, "session registered");
                self.sessions.register(connection.clone(), session);
            }
            Err(e) => tracing::warn!(%connection, "invalid session id: {}", e),
        }
    }

    /// 接続のセッションを決める
    ///
    /// 登録済みならそれを使い、未登録ならイベントに載っているセッションで自動登録する。
    pub(super) fn resolve_sender(
        &mut self,
        connection: &ConnectionId,
        claimed: Option<String>,
    ) -> Option<SessionId> {
        if let Some(session) = self.sessions.session_of(connection) {
            return Some(session.clone());
        }
        let session = SessionId::try_from(claimed?).ok()?;
        self.sessions.register(connection.clone(), session.clone());
        tracing::debug!(%connection, %session, "session auto-registered");
        Some(session)
    }

    pub(super) async fn join_lobby(&mut self, connection: &ConnectionId) {
        self.lobby.insert(connection.clone());
        tracing::debug!(%connection, subscribers = self.lobby.len(), "joined lobby");
        self.send_main_stage_status(connection).await;
        let event = self.active_rooms_event();
        self.send(connection, &event).await;
    }

    pub(super) fn leave_lobby(&mut self, connection: &ConnectionId) {
        self.lobby.remove(connection);
        tracing::debug!(%connection, subscribers = self.lobby.len(), "left lobby");
    }

    pub(super) fn main_stage_payload(&self) -> MainStagePayload {
        MainStagePayload {
            room_id: self
                .main_stage
                .room_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
            ends_at: self.main_stage.ends_at,
        }
    }

    pub(super) async fn send_main_stage_status(&self, connection: &ConnectionId) {
        let event = ServerEvent::MainStageStatus(self.main_stage_payload());
        self.send(connection, &event).await;
    }

    fn active_rooms_event(&self) -> ServerEvent {
        ServerEvent::ActiveRoomsUpdate {
            rooms: self
                .rooms
                .active_rooms()
                .into_iter()
                .map(|room| RoomSummaryPayload {
                    room_id: room.id.as_str().to_string(),
                    viewer_count: room.viewer_count(),
                })
                .collect(),
        }
    }

    pub(super) async fn broadcast_active_rooms(&self) {
        let event = self.active_rooms_event();
        self.broadcast_lobby(&event).await;
    }

    pub(super) async fn create_room(
        &mut self,
        connection: &ConnectionId,
        session: String,
        room_id: String,
    ) {
        let room_id = match RoomId::try_from(room_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(%connection, "create-room rejected: {}", e);
                let event = ServerEvent::RoomError {
                    message: e.to_string(),
                };
                self.send(connection, &event).await;
                return;
            }
        };
        self.resolve_sender(connection, Some(session));

        match self.rooms.reserve(room_id.clone(), connection.clone()) {
            Ok(()) => {
                tracing::info!(%connection, room_id = %room_id, "room reserved");
                let event = ServerEvent::RoomCreated {
                    room_id: room_id.into_string(),
                };
                self.send(connection, &event).await;
            }
            Err(ReserveError::AlreadyExists) => {
                tracing::info!(%connection, room_id = %room_id, "room already exists");
                let event = ServerEvent::RoomError {
                    message: ROOM_ALREADY_EXISTS.to_string(),
                };
                self.send(connection, &event).await;
            }
        }
    }
}
