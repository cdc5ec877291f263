//! Message formatting utilities for client display.

use kupid_shared::{
    protocol::{ChatEntryPayload, MainStagePayload, RoomSummaryPayload, RoundPayload, ServerEvent},
    time::timestamp_to_jst_rfc3339,
};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a server event for the terminal
    ///
    /// # Arguments
    ///
    /// * `event` - The received event
    /// * `local_session` - This client's session id (to mark as "me")
    ///
    /// # Returns
    ///
    /// `None` for signaling events, which are not shown
    pub fn format_event(event: &ServerEvent, local_session: &str) -> Option<String> {
        let me = |session: &str| {
            if session == local_session {
                format!("{} (me)", session)
            } else {
                session.to_string()
            }
        };

        let text = match event {
            ServerEvent::RoomCreated { room_id } => format!("\n* Room '{}' created\n", room_id),
            ServerEvent::RoomError { message } => format!("\n! Room error: {}\n", message),
            ServerEvent::MatchFound { room_id } => {
                format!("\n* Match found! Joining room '{}'\n", room_id)
            }
            ServerEvent::ExistingParticipants {
                participant_sessions,
            } => Self::format_participants("Participants", participant_sessions, local_session),
            ServerEvent::CurrentParticipants {
                participant_sessions,
            } => Self::format_participants(
                "Watching as spectator. Participants",
                participant_sessions,
                local_session,
            ),
            ServerEvent::UserJoined { session } => format!("\n+ {} joined\n", me(session)),
            ServerEvent::UserLeft { session } => format!("\n- {} left\n", me(session)),
            ServerEvent::ChatHistory { history } => Self::format_chat_history(history),
            ServerEvent::NewChatMessage { message } => Self::format_chat_message(message),
            ServerEvent::NewReaction { session, reaction } => {
                format!("\n{} reacted {}\n", me(session), reaction)
            }
            ServerEvent::MediaStateUpdate {
                session,
                muted,
                video_off,
            } => format!(
                "\n~ {}: {}, {}\n",
                me(session),
                if *muted { "muted" } else { "unmuted" },
                if *video_off { "video off" } else { "video on" }
            ),
            ServerEvent::ViewerCountUpdate { count } => format!("\n~ {} watching\n", count),
            ServerEvent::ActiveRoomsUpdate { rooms } => Self::format_active_rooms(rooms),
            ServerEvent::MainStageStatus(stage) | ServerEvent::MainStageUpdate(stage) => {
                Self::format_main_stage(stage)
            }
            ServerEvent::RoundStart(round) => Self::format_round(round),
            ServerEvent::RoundEnd { message, .. } => format!("\n# {}\n", message),
            ServerEvent::CurrentRound { round, .. } => match round {
                Some(round) => Self::format_round(round),
                None => "\n# No round in progress\n".to_string(),
            },
            ServerEvent::RoundsError { message } => format!("\n! {}\n", message),
            ServerEvent::Offer { .. } | ServerEvent::Answer { .. } | ServerEvent::Candidate { .. } => {
                return None;
            }
        };
        Some(text)
    }

    fn format_participants(title: &str, sessions: &[String], local_session: &str) -> String {
        let mut output = String::new();
        output.push_str("\n\n============================================================\n");
        output.push_str(&format!("{}:\n", title));

        if sessions.is_empty() {
            output.push_str("(No other participants)\n");
        } else {
            for session in sessions {
                let me_suffix = if session == local_session { " (me)" } else { "" };
                output.push_str(&format!("{}{}\n", session, me_suffix));
            }
        }

        output.push_str("============================================================\n");
        output
    }

    /// Format a chat message
    pub fn format_chat_message(message: &ChatEntryPayload) -> String {
        format!(
            "\n\n------------------------------------------------------------\n\
             @{}: {}\n\
             sent at {}\n\
             ------------------------------------------------------------\n",
            message.sender_session, message.text, message.timestamp
        )
    }

    fn format_chat_history(history: &[ChatEntryPayload]) -> String {
        if history.is_empty() {
            return "\n(No chat history)\n".to_string();
        }
        let mut output = format!("\n--- {} earlier messages ---\n", history.len());
        for message in history {
            output.push_str(&format!("@{}: {}\n", message.sender_session, message.text));
        }
        output
    }

    fn format_active_rooms(rooms: &[RoomSummaryPayload]) -> String {
        if rooms.is_empty() {
            return "\n[lobby] No active rooms\n".to_string();
        }
        let list: Vec<String> = rooms
            .iter()
            .map(|r| format!("{} ({} watching)", r.room_id, r.viewer_count))
            .collect();
        format!("\n[lobby] Active rooms: {}\n", list.join(", "))
    }

    fn format_main_stage(stage: &MainStagePayload) -> String {
        match (&stage.room_id, stage.ends_at) {
            (Some(room_id), Some(ends_at)) => format!(
                "\n[main stage] '{}' until {}\n",
                room_id,
                timestamp_to_jst_rfc3339(ends_at)
            ),
            _ => "\n[main stage] Nothing featured\n".to_string(),
        }
    }

    fn format_round(round: &RoundPayload) -> String {
        format!(
            "\n# Round {}/{}: {}\n  {}\n  ends at {}\n",
            round.index + 1,
            round.total,
            round.title,
            round.prompt,
            timestamp_to_jst_rfc3339(round.ends_at)
        )
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_existing_participants_marks_nothing_when_empty() {
        // テスト項目: 参加者が空の場合、適切なメッセージが表示される
        // given (前提条件):
        let event = ServerEvent::ExistingParticipants {
            participant_sessions: vec![],
        };

        // when (操作):
        let result = MessageFormatter::format_event(&event, "alice").unwrap();

        // then (期待する結果):
        assert!(result.contains("Participants:"));
        assert!(result.contains("(No other participants)"));
    }

    #[test]
    fn test_format_user_joined_marks_me() {
        // テスト項目: 自分のセッションには (me) が付く
        // given (前提条件):
        let event = ServerEvent::UserLeft {
            session: "alice".to_string(),
        };

        // when (操作):
        let result = MessageFormatter::format_event(&event, "alice").unwrap();

        // then (期待する結果):
        assert!(result.contains("- alice (me) left"));
    }

    #[test]
    fn test_format_chat_message() {
        // テスト項目: チャットメッセージが正しくフォーマットされる
        // given (前提条件):
        let event = ServerEvent::NewChatMessage {
            message: ChatEntryPayload {
                id: "1".to_string(),
                sender_session: "alice".to_string(),
                text: "Hello, world!".to_string(),
                timestamp: "2023-01-01T00:00:00+09:00".to_string(),
            },
        };

        // when (操作):
        let result = MessageFormatter::format_event(&event, "bob").unwrap();

        // then (期待する結果):
        assert!(result.contains("@alice: Hello, world!"));
        assert!(result.contains("sent at 2023-01-01"));
    }

    #[test]
    fn test_format_round_start() {
        // テスト項目: ラウンド開始が 1 始まりの番号と終了時刻付きで表示される
        // given (前提条件):
        let event = ServerEvent::RoundStart(RoundPayload {
            room_id: "abc".to_string(),
            title: "Icebreaker".to_string(),
            prompt: "Say hi".to_string(),
            ends_at: 1672498800000,
            index: 0,
            total: 3,
        });

        // when (操作):
        let result = MessageFormatter::format_event(&event, "bob").unwrap();

        // then (期待する結果):
        assert!(result.contains("Round 1/3: Icebreaker"));
        assert!(result.contains("2023-01-01"));
    }

    #[test]
    fn test_format_main_stage_cleared() {
        // テスト項目: 空のメインステージは "Nothing featured" と表示される
        // given (前提条件):
        let event = ServerEvent::MainStageUpdate(MainStagePayload {
            room_id: None,
            ends_at: None,
        });

        // when (操作):
        let result = MessageFormatter::format_event(&event, "bob").unwrap();

        // then (期待する結果):
        assert!(result.contains("Nothing featured"));
    }

    #[test]
    fn test_signaling_events_are_hidden() {
        // テスト項目: シグナリングのイベントは表示しない
        // given (前提条件):
        let event = ServerEvent::Candidate {
            from_session: "alice".to_string(),
            payload: serde_json::json!({"candidate": "x"}),
        };

        // when (操作):
        let result = MessageFormatter::format_event(&event, "bob");

        // then (期待する結果):
        assert!(result.is_none());
    }

    #[test]
    fn test_format_raw_message() {
        // テスト項目: 生メッセージが正しくフォーマットされる
        // given (前提条件):
        let text = "unknown message format";

        // when (操作):
        let result = MessageFormatter::format_raw_message(text);

        // then (期待する結果):
        assert!(result.contains("unknown message format"));
        assert!(result.contains("Received:"));
    }
}
