//! RoomRegistry
//!
//! ルームのライフサイクル（作成・参加・退出・破棄）とメンバーシップを管理する。
//!
//! ## (ルーム, セッション) ごとの状態遷移
//!
//! ```text
//! absent -> participant -> absent
//! absent -> spectator   -> absent
//! ```
//!
//! participant と spectator の間の直接遷移はない。再参加は常に absent から
//! 評価し直す。ルームは存在しない ID への最初の参加で作られ、空になった時点で破棄される。

use std::collections::HashMap;

use super::{
    entity::{ChatEntry, Member, Role, Room},
    value_object::{ConnectionId, RoomId, SessionId},
};

/// `join` の結果（通知先の計算に必要な情報）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub role: Role,
    /// このルームが今回の参加で作られたか
    pub created: bool,
    /// 参加者なら自分以外の参加者、観客なら全参加者
    pub participant_sessions: Vec<SessionId>,
    /// `user-joined` を送るべき接続（既存参加者と観客）
    ///
    /// 参加者枠が埋まったときだけ送る。観客としての参加と、同じセッションが
    /// 参加者のまま再参加した場合は空になる。
    pub notify_joined: Vec<ConnectionId>,
    pub participant_count: usize,
    pub viewer_count: usize,
    /// ルームの全メンバーの接続（参加後）
    pub members: Vec<ConnectionId>,
}

/// 1 ルーム分の `leave` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub room_id: RoomId,
    pub removed: Vec<(Role, Member)>,
    pub participant_count: usize,
    pub viewer_count: usize,
    /// ルームの残りのメンバーの接続
    pub remaining: Vec<ConnectionId>,
    pub destroyed: bool,
}

impl LeaveOutcome {
    pub fn removed_participant(&self) -> bool {
        self.removed
            .iter()
            .any(|(role, _)| *role == Role::Participant)
    }
}

/// `create-room` の予約に失敗した理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveError {
    AlreadyExists,
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    /// `create-room` で予約されたが、まだ誰も参加していないルーム ID
    reservations: HashMap<RoomId, ConnectionId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn participant_count(&self, room_id: &RoomId) -> usize {
        self.rooms
            .get(room_id)
            .map(Room::participant_count)
            .unwrap_or(0)
    }

    /// ルームに参加する
    ///
    /// 1. ルームがなければ作る（予約があれば消費する）
    /// 2. 同じセッションの既存メンバーシップを取り除く
    /// 3. 参加者が 2 人未満なら参加者、そうでなければ観客として追加する
    pub fn join(&mut self, room_id: RoomId, member: Member, now: i64) -> JoinOutcome {
        self.reservations.remove(&room_id);

        let created = !self.rooms.contains_key(&room_id);
        let room = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id, now));

        let session = member.session.clone();
        let previous = room.remove_session(&session).map(|(role, _)| role);
        let role = room.admit(member);

        let (participant_sessions, notify_joined) = match role {
            Role::Participant => {
                let others: Vec<&Member> = room
                    .participants
                    .iter()
                    .filter(|m| m.session != session)
                    .collect();
                let sessions = others.iter().map(|m| m.session.clone()).collect();
                // 参加者のまま再参加した場合は再通知しない
                let notify = if previous == Some(Role::Participant) {
                    Vec::new()
                } else {
                    others
                        .iter()
                        .copied()
                        .chain(room.spectators.iter())
                        .map(|m| m.connection.clone())
                        .collect()
                };
                (sessions, notify)
            }
            Role::Spectator => (room.participant_sessions(), Vec::new()),
        };

        JoinOutcome {
            role,
            created,
            participant_sessions,
            notify_joined,
            participant_count: room.participant_count(),
            viewer_count: room.viewer_count(),
            members: room.connections(),
        }
    }

    /// 接続のメンバーシップを取り除く
    ///
    /// `room_id` が `None` なら全ルームが対象。取り除くのはこの接続から作られた
    /// メンバーシップだけなので、同じセッションが新しい接続で再参加していれば
    /// そちらは残る。空になったルームは破棄する。
    pub fn leave(
        &mut self,
        connection: &ConnectionId,
        room_id: Option<&RoomId>,
    ) -> Vec<LeaveOutcome> {
        let targets: Vec<RoomId> = match room_id {
            Some(id) => vec![id.clone()],
            None => self.rooms.keys().cloned().collect(),
        };

        let mut outcomes = Vec::new();
        for id in targets {
            let Some(room) = self.rooms.get_mut(&id) else {
                continue;
            };
            let removed = room.remove_connection(connection);
            if removed.is_empty() {
                continue;
            }

            let destroyed = room.is_empty();
            let outcome = LeaveOutcome {
                room_id: id.clone(),
                removed,
                participant_count: room.participant_count(),
                viewer_count: room.viewer_count(),
                remaining: room.connections(),
                destroyed,
            };
            if destroyed {
                self.rooms.remove(&id);
            }
            outcomes.push(outcome);
        }

        outcomes.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        outcomes
    }

    /// `create-room` の予約
    pub fn reserve(&mut self, room_id: RoomId, owner: ConnectionId) -> Result<(), ReserveError> {
        if self.rooms.contains_key(&room_id) || self.reservations.contains_key(&room_id) {
            return Err(ReserveError::AlreadyExists);
        }
        self.reservations.insert(room_id, owner);
        Ok(())
    }

    /// 接続が持っている予約をすべて解放する
    pub fn release_reservations(&mut self, owner: &ConnectionId) {
        self.reservations.retain(|_, c| c != owner);
    }

    pub fn is_reserved(&self, room_id: &RoomId) -> bool {
        self.reservations.contains_key(room_id)
    }

    /// チャットを追加し、ルームの全メンバーの接続を返す
    pub fn append_chat(&mut self, room_id: &RoomId, entry: ChatEntry) -> Option<Vec<ConnectionId>> {
        let room = self.rooms.get_mut(room_id)?;
        room.append_chat(entry);
        Some(room.connections())
    }

    /// 参加者が 1 人以上いるルーム（ルーム ID 順）
    pub fn active_rooms(&self) -> Vec<&Room> {
        let mut rooms: Vec<&Room> = self
            .rooms
            .values()
            .filter(|room| room.participant_count() >= 1)
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }
}
