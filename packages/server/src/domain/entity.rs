//! Entities
//!
//! ルーム・メインステージ・ラウンド進行の状態を表すエンティティです。

use serde::Serialize;

use super::{
    round::RoundPrompt,
    value_object::{ChatText, ConnectionId, RoomId, SessionId},
};

/// 1 ルームあたりの参加者（映像を送る側）の上限
pub const MAX_PARTICIPANTS: usize = 2;

/// ルーム内での役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Participant,
    Spectator,
}

/// ルームのメンバー（どの接続から参加したかを保持する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub session: SessionId,
    pub connection: ConnectionId,
}

impl Member {
    pub fn new(session: SessionId, connection: ConnectionId) -> Self {
        Self {
            session,
            connection,
        }
    }
}

/// チャットログの 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub id: String,
    pub sender: SessionId,
    pub text: ChatText,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl ChatEntry {
    pub fn new(sender: SessionId, text: ChatText, timestamp: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            text,
            timestamp,
        }
    }
}

/// ルーム
///
/// ## 不変条件
///
/// - `participants.len() <= MAX_PARTICIPANTS`
/// - 1 つのセッションは participants / spectators のどちらか一方に高々 1 回だけ現れる
/// - 空になったルームは `RoomRegistry` によって即座に破棄される
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub participants: Vec<Member>,
    pub spectators: Vec<Member>,
    pub chat_history: Vec<ChatEntry>,
    pub created_at: i64,
}

impl Room {
    pub fn new(id: RoomId, created_at: i64) -> Self {
        Self {
            id,
            participants: Vec::new(),
            spectators: Vec::new(),
            chat_history: Vec::new(),
            created_at,
        }
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// participants + spectators
    pub fn viewer_count(&self) -> usize {
        self.participants.len() + self.spectators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.spectators.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= MAX_PARTICIPANTS
    }

    pub fn role_of(&self, session: &SessionId) -> Option<Role> {
        if self.participants.iter().any(|m| &m.session == session) {
            Some(Role::Participant)
        } else if self.spectators.iter().any(|m| &m.session == session) {
            Some(Role::Spectator)
        } else {
            None
        }
    }

    /// 空きがあれば参加者、満員なら観客として追加する
    ///
    /// 呼び出し側は事前に同じセッションの既存メンバーシップを取り除いておくこと。
    pub fn admit(&mut self, member: Member) -> Role {
        if self.is_full() {
            self.spectators.push(member);
            Role::Spectator
        } else {
            self.participants.push(member);
            Role::Participant
        }
    }

    /// セッションのメンバーシップを（どちらの役割であっても）取り除く
    pub fn remove_session(&mut self, session: &SessionId) -> Option<(Role, Member)> {
        if let Some(pos) = self.participants.iter().position(|m| &m.session == session) {
            return Some((Role::Participant, self.participants.remove(pos)));
        }
        if let Some(pos) = self.spectators.iter().position(|m| &m.session == session) {
            return Some((Role::Spectator, self.spectators.remove(pos)));
        }
        None
    }

    /// 指定した接続から作られたメンバーシップだけを取り除く
    pub fn remove_connection(&mut self, connection: &ConnectionId) -> Vec<(Role, Member)> {
        let mut removed = Vec::new();
        self.participants.retain(|m| {
            if &m.connection == connection {
                removed.push((Role::Participant, m.clone()));
                false
            } else {
                true
            }
        });
        self.spectators.retain(|m| {
            if &m.connection == connection {
                removed.push((Role::Spectator, m.clone()));
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn participant_sessions(&self) -> Vec<SessionId> {
        self.participants.iter().map(|m| m.session.clone()).collect()
    }

    /// 全メンバー（参加者 + 観客）の接続
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.participants
            .iter()
            .chain(self.spectators.iter())
            .map(|m| m.connection.clone())
            .collect()
    }

    pub fn append_chat(&mut self, entry: ChatEntry) {
        self.chat_history.push(entry);
    }
}

/// メインステージ（プロセス全体で 1 つだけの注目ルーム）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainStage {
    pub room_id: Option<RoomId>,
    /// Unix milliseconds
    pub ends_at: Option<i64>,
}

impl MainStage {
    pub fn feature(&mut self, room_id: RoomId, ends_at: i64) {
        self.room_id = Some(room_id);
        self.ends_at = Some(ends_at);
    }

    pub fn clear(&mut self) {
        self.room_id = None;
        self.ends_at = None;
    }

    pub fn is_empty(&self) -> bool {
        self.room_id.is_none()
    }

    pub fn is_featuring(&self, room_id: &RoomId) -> bool {
        self.room_id.as_ref() == Some(room_id)
    }
}

/// ルームごとのラウンド進行状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub rounds: Vec<RoundPrompt>,
    pub current_index: usize,
    /// Unix milliseconds
    pub ends_at: i64,
}

impl RoundState {
    pub fn new(rounds: Vec<RoundPrompt>) -> Self {
        Self {
            rounds,
            current_index: 0,
            ends_at: 0,
        }
    }

    pub fn current(&self) -> Option<&RoundPrompt> {
        self.rounds.get(self.current_index)
    }

    pub fn total(&self) -> usize {
        self.rounds.len()
    }
}
