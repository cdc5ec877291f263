//! UseCase: 読み取り専用の問い合わせ（HTTP API 用）
//!
//! Coordinator の状態のスナップショットを oneshot チャンネルで返す。

use tokio::sync::oneshot;

use crate::domain::{MainStage, Room, RoomId, RoundState};

use super::coordinator::Coordinator;

/// ルームのスナップショット
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub room: Room,
    pub round: Option<RoundState>,
    pub featured: bool,
}

#[derive(Debug)]
pub enum Query {
    /// アクティブなルーム（参加者が 1 人以上）
    Rooms(oneshot::Sender<Vec<RoomSnapshot>>),
    Room(RoomId, oneshot::Sender<Option<RoomSnapshot>>),
    MainStage(oneshot::Sender<MainStage>),
}

impl Coordinator {
    fn snapshot(&self, room: &Room) -> RoomSnapshot {
        RoomSnapshot {
            room: room.clone(),
            round: self.rounds.get(&room.id).cloned(),
            featured: self.main_stage.is_featuring(&room.id),
        }
    }

    pub(super) fn answer(&self, query: Query) {
        // 問い合わせ元が既にいなくなっていても問題ない
        match query {
            Query::Rooms(reply) => {
                let rooms = self
                    .rooms
                    .active_rooms()
                    .into_iter()
                    .map(|room| self.snapshot(room))
                    .collect();
                let _ = reply.send(rooms);
            }
            Query::Room(room_id, reply) => {
                let room = self.rooms.get(&room_id).map(|room| self.snapshot(room));
                let _ = reply.send(room);
            }
            Query::MainStage(reply) => {
                let _ = reply.send(self.main_stage.clone());
            }
        }
    }
}
