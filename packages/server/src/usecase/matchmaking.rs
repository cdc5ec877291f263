//! UseCase: マッチメイキング
//!
//! キューに 2 人以上並んだら先頭の 2 人を取り出し、新しいルーム ID を
//! `match-found` で両者に知らせる。ルームの実体は両者の `join-room` で作られる。

use kupid_shared::protocol::ServerEvent;

use crate::domain::{ConnectionId, RoomId, SessionId};

use super::coordinator::Coordinator;

impl Coordinator {
    pub(super) async fn enter_queue(&mut self, connection: &ConnectionId, session: String) {
        let Some(session) = self.resolve_sender(connection, Some(session)) else {
            tracing::warn!(%connection, "enter-matchmaking-queue without a valid session");
            return;
        };
        if self.queue.enqueue(session.clone(), connection.clone()) {
            tracing::info!(%session, waiting = self.queue.len(), "entered matchmaking queue");
        } else {
            tracing::debug!(%session, "already in matchmaking queue");
        }
        self.try_match().await;
    }

    pub(super) fn leave_queue(&mut self, connection: &ConnectionId, session: String) {
        let session = match SessionId::try_from(session) {
            Ok(session) => session,
            Err(_) => match self.sessions.session_of(connection) {
                Some(session) => session.clone(),
                None => return,
            },
        };
        if self.queue.remove_session(&session) {
            tracing::info!(%session, waiting = self.queue.len(), "left matchmaking queue");
        }
    }

    /// キューから 2 人ずつ取り出してマッチさせる
    pub(super) async fn try_match(&mut self) {
        while let Some(pair) = self.queue.pop_pair() {
            let room_id = RoomId::generate();
            tracing::info!(
                room_id = %room_id,
                first = %pair.first.session,
                second = %pair.second.session,
                "match found"
            );
            let event = ServerEvent::MatchFound {
                room_id: room_id.into_string(),
            };
            for entry in [&pair.first, &pair.second] {
                let target = self
                    .sessions
                    .resolve(&entry.session)
                    .cloned()
                    .unwrap_or_else(|| entry.connection.clone());
                self.send(&target, &event).await;
            }
        }
    }
}
