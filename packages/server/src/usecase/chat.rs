//! UseCase: ルーム内のチャット・リアクション・メディア状態の共有

use kupid_shared::{
    protocol::{ChatEntryPayload, ServerEvent},
    time::timestamp_to_jst_rfc3339,
};

use crate::domain::{ChatEntry, ChatText, ConnectionId, RoomId};

use super::coordinator::Coordinator;

/// チャットログ 1 件をワイヤー形式に変換
pub(super) fn chat_payload(entry: &ChatEntry) -> ChatEntryPayload {
    ChatEntryPayload {
        id: entry.id.clone(),
        sender_session: entry.sender.as_str().to_string(),
        text: entry.text.as_str().to_string(),
        timestamp: timestamp_to_jst_rfc3339(entry.timestamp),
    }
}

impl Coordinator {
    /// チャットを追加し、送信者を含むルームの全員に配信する
    pub(super) async fn send_chat(
        &mut self,
        connection: &ConnectionId,
        room_id: String,
        session: String,
        message: String,
    ) {
        let Ok(room_id) = RoomId::try_from(room_id) else {
            return;
        };
        let Some(sender) = self.resolve_sender(connection, Some(session)) else {
            tracing::warn!(%connection, "chat from connection without a session");
            return;
        };
        let text = match ChatText::try_from(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%connection, "chat message rejected: {}", e);
                return;
            }
        };

        let entry = ChatEntry::new(sender, text, self.now());
        let payload = chat_payload(&entry);
        match self.rooms.append_chat(&room_id, entry) {
            Some(targets) => {
                tracing::debug!(room_id = %room_id, sender = %payload.sender_session, "chat message");
                let event = ServerEvent::NewChatMessage { message: payload };
                self.broadcast(targets, &event).await;
            }
            None => tracing::debug!(room_id = %room_id, "chat for unknown room dropped"),
        }
    }

    pub(super) async fn send_reaction(
        &mut self,
        connection: &ConnectionId,
        room_id: String,
        reaction: String,
    ) {
        let Ok(room_id) = RoomId::try_from(room_id) else {
            return;
        };
        let Some(sender) = self.resolve_sender(connection, None) else {
            return;
        };
        if !self.rooms.contains(&room_id) {
            return;
        }
        let event = ServerEvent::NewReaction {
            session: sender.into_string(),
            reaction,
        };
        self.broadcast_room(&room_id, &event).await;
    }

    /// ミュート・カメラオフの状態を自分以外のメンバーに共有する
    pub(super) async fn update_media_state(
        &mut self,
        connection: &ConnectionId,
        room_id: String,
        session: String,
        muted: bool,
        video_off: bool,
    ) {
        let Ok(room_id) = RoomId::try_from(room_id) else {
            return;
        };
        let Some(sender) = self.resolve_sender(connection, Some(session)) else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        let targets: Vec<ConnectionId> = room
            .connections()
            .into_iter()
            .filter(|c| c != connection)
            .collect();
        let event = ServerEvent::MediaStateUpdate {
            session: sender.into_string(),
            muted,
            video_off,
        };
        self.broadcast(targets, &event).await;
    }
}

#[cfg(test)]
mod tests {
    use kupid_shared::protocol::{ClientEvent, ServerEvent};

    use crate::usecase::test_support::TestHarness;

    #[tokio::test(start_paused = true)]
    async fn test_chat_is_broadcast_to_all_members_including_sender() {
        // テスト項目: チャットが送信者を含むルームの全メンバーに届く
        // given (前提条件):
        let harness = TestHarness::start();
        let mut s1 = harness.connect("c1");
        let mut s2 = harness.connect("c2");
        s1.join("abc", "S1");
        s2.join("abc", "S2");
        s1.drain().await;
        s2.drain().await;

        // when (操作):
        s1.send(ClientEvent::SendChatMessage {
            room_id: "abc".to_string(),
            session: "S1".to_string(),
            message: "hi there".to_string(),
        });

        // then (期待する結果):
        for client in [&mut s1, &mut s2] {
            match client.recv().await {
                ServerEvent::NewChatMessage { message } => {
                    assert_eq!(message.sender_session, "S1");
                    assert_eq!(message.text, "hi there");
                    assert!(message.timestamp.contains("+09:00"));
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_chat_is_dropped() {
        // テスト項目: 空白のみのチャットは配信されない
        // given (前提条件):
        let harness = TestHarness::start();
        let mut s1 = harness.connect("c1");
        s1.join("abc", "S1");
        s1.drain().await;

        // when (操作):
        s1.send(ClientEvent::SendChatMessage {
            room_id: "abc".to_string(),
            session: "S1".to_string(),
            message: "   ".to_string(),
        });

        // then (期待する結果):
        assert!(s1.drain().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_state_goes_to_other_members_only() {
        // テスト項目: メディア状態は自分以外のメンバーにだけ共有される
        // given (前提条件):
        let harness = TestHarness::start();
        let mut s1 = harness.connect("c1");
        let mut s2 = harness.connect("c2");
        s1.join("abc", "S1");
        s2.join("abc", "S2");
        s1.drain().await;
        s2.drain().await;

        // when (操作):
        s1.send(ClientEvent::MediaState {
            room_id: "abc".to_string(),
            session: "S1".to_string(),
            muted: true,
            video_off: false,
        });

        // then (期待する結果):
        assert_eq!(
            s2.recv().await,
            ServerEvent::MediaStateUpdate {
                session: "S1".to_string(),
                muted: true,
                video_off: false
            }
        );
        assert!(s1.drain().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaction_reaches_spectators() {
        // テスト項目: リアクションが観客を含むルーム全体に届く
        // given (前提条件):
        let harness = TestHarness::start();
        let s1 = harness.connect("c1");
        let s2 = harness.connect("c2");
        let mut s3 = harness.connect("c3");
        s1.join("abc", "S1");
        s2.join("abc", "S2");
        s3.join("abc", "S3");
        s3.drain().await;

        // when (操作):
        s1.send(ClientEvent::SendReaction {
            room_id: "abc".to_string(),
            reaction: "🔥".to_string(),
        });

        // then (期待する結果):
        assert_eq!(
            s3.recv().await,
            ServerEvent::NewReaction {
                session: "S1".to_string(),
                reaction: "🔥".to_string()
            }
        );
    }
}
