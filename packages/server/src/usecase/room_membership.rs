//! UseCase: ルームへの参加・退出
//!
//! ## 参加（join-room）
//!
//! 1. セッションを自動登録し、マッチメイキングのキューから外す
//! 2. RoomRegistry に参加（参加者 or 観客）
//! 3. 参加者なら `existing-participants`（自分以外の参加者）を本人に、
//!    `user-joined` を既存参加者と観客に送る。観客なら `current-participants` を本人に送る
//! 4. `chat-history` を本人に、`viewer-count-update` をルームに、
//!    `active-rooms-update` をロビーに送る
//! 5. 参加者が 2 人揃い、メインステージが空いていれば昇格させる
//!
//! 参加した側が常にネゴシエーションの開始側（offer を送る側）になる。
//!
//! ## 退出（leave-room / 切断）
//!
//! ルームの残りのメンバーに `user-left` を送り、参加者が 2 人未満になれば
//! ラウンドを止める。空になったルームは破棄され、メインステージに出ていれば
//! 即座にクリアされる。

use kupid_shared::protocol::ServerEvent;

use crate::domain::{ConnectionId, Member, Role, RoomId, SessionId, entity::MAX_PARTICIPANTS};

use super::{chat::chat_payload, coordinator::Coordinator};

impl Coordinator {
    pub(super) async fn join_room(
        &mut self,
        connection: &ConnectionId,
        room_id: String,
        session: String,
    ) {
        let (room_id, session) = match (RoomId::try_from(room_id), SessionId::try_from(session)) {
            (Ok(room_id), Ok(session)) => (room_id, session),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(%connection, "join-room rejected: {}", e);
                return;
            }
        };

        self.sessions.register(connection.clone(), session.clone());
        if self.queue.remove_session(&session) {
            tracing::debug!(%session, "removed from matchmaking queue on join");
        }

        let now = self.now();
        let outcome = self.rooms.join(
            room_id.clone(),
            Member::new(session.clone(), connection.clone()),
            now,
        );
        if outcome.created {
            tracing::info!(room_id = %room_id, "room created");
        }
        tracing::info!(
            room_id = %room_id,
            %session,
            role = ?outcome.role,
            participants = outcome.participant_count,
            viewers = outcome.viewer_count,
            "joined room"
        );

        let participant_sessions: Vec<String> = outcome
            .participant_sessions
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        match outcome.role {
            Role::Participant => {
                let event = ServerEvent::ExistingParticipants {
                    participant_sessions,
                };
                self.send(connection, &event).await;

                let joined = ServerEvent::UserJoined {
                    session: session.as_str().to_string(),
                };
                self.broadcast(outcome.notify_joined.clone(), &joined).await;
            }
            Role::Spectator => {
                let event = ServerEvent::CurrentParticipants {
                    participant_sessions,
                };
                self.send(connection, &event).await;
            }
        }

        let history = self
            .rooms
            .get(&room_id)
            .map(|room| room.chat_history.iter().map(chat_payload).collect())
            .unwrap_or_default();
        self.send(connection, &ServerEvent::ChatHistory { history })
            .await;

        let count = ServerEvent::ViewerCountUpdate {
            count: outcome.viewer_count,
        };
        self.broadcast(outcome.members.clone(), &count).await;
        self.broadcast_active_rooms().await;

        if outcome.role == Role::Participant
            && outcome.participant_count == MAX_PARTICIPANTS
            && self.main_stage.is_empty()
        {
            self.promote(room_id).await;
        }
    }

    pub(super) async fn leave_room(&mut self, connection: &ConnectionId, room_id: String) {
        match RoomId::try_from(room_id) {
            Ok(room_id) => self.leave_rooms(connection, Some(&room_id)).await,
            Err(e) => tracing::warn!(%connection, "leave-room rejected: {}", e),
        }
    }

    /// 接続のメンバーシップを取り除き、依存する状態を片付ける
    ///
    /// `room_id` が `None` なら接続が参加している全てのルームが対象（切断時）。
    pub(super) async fn leave_rooms(&mut self, connection: &ConnectionId, room_id: Option<&RoomId>) {
        let outcomes = self.rooms.leave(connection, room_id);
        if outcomes.is_empty() {
            return;
        }

        let mut participant_left = false;
        for outcome in outcomes {
            for (role, member) in &outcome.removed {
                tracing::info!(
                    room_id = %outcome.room_id,
                    session = %member.session,
                    ?role,
                    remaining = outcome.viewer_count,
                    "left room"
                );
                let left = ServerEvent::UserLeft {
                    session: member.session.as_str().to_string(),
                };
                self.broadcast(outcome.remaining.clone(), &left).await;
            }

            if outcome.removed_participant() {
                participant_left = true;
                if outcome.participant_count < MAX_PARTICIPANTS {
                    self.stop_rounds(&outcome.room_id);
                }
            }

            if outcome.destroyed {
                tracing::info!(room_id = %outcome.room_id, "room destroyed");
                self.stop_rounds(&outcome.room_id);
            } else {
                let count = ServerEvent::ViewerCountUpdate {
                    count: outcome.viewer_count,
                };
                self.broadcast(outcome.remaining.clone(), &count).await;
            }

            if outcome.participant_count == 0 && self.main_stage.is_featuring(&outcome.room_id) {
                self.end_main_stage().await;
            }
        }

        self.broadcast_active_rooms().await;

        if participant_left && self.config.promote_on_participant_leave {
            self.try_match().await;
        }
    }

    /// 自分以外の参加者を `existing-participants` で返す（参加者数の再確認用）
    pub(super) async fn send_room_participants(&mut self, connection: &ConnectionId, room_id: String) {
        let Ok(room_id) = RoomId::try_from(room_id) else {
            return;
        };
        let requester = self.sessions.session_of(connection).cloned();
        let Some(room) = self.rooms.get(&room_id) else {
            tracing::debug!(room_id = %room_id, "get-room-participants for unknown room");
            return;
        };
        let participant_sessions = room
            .participants
            .iter()
            .filter(|m| Some(&m.session) != requester.as_ref())
            .map(|m| m.session.as_str().to_string())
            .collect();
        let event = ServerEvent::ExistingParticipants {
            participant_sessions,
        };
        self.send(connection, &event).await;
    }
}
