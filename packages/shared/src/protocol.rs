//! Wire protocol shared by the server and the client.
//!
//! Every WebSocket text frame carries one JSON object tagged by `"type"` with a
//! kebab-case event name. Payload fields are camelCase.
//!
//! Negotiation payloads (`offer` / `answer` / `candidate`) are opaque to the
//! server: it forwards the `payload` value untouched. Clients interpret them
//! as [`SessionDescription`] and [`IceCandidate`].

use serde::{Deserialize, Serialize};

/// Events sent by a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    RegisterSession { session: String },
    JoinLobby,
    LeaveLobby,
    GetMainStageStatus,
    #[serde(rename_all = "camelCase")]
    CreateRoom { session: String, room_id: String },
    #[serde(rename_all = "camelCase")]
    EnterMatchmakingQueue { session: String },
    #[serde(rename_all = "camelCase")]
    LeaveMatchmakingQueue { session: String },
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String, session: String },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: String },
    #[serde(rename_all = "camelCase")]
    GetRoomParticipants { room_id: String },
    #[serde(rename_all = "camelCase")]
    Offer {
        to_session: String,
        payload: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    Answer {
        to_session: String,
        payload: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    Candidate {
        to_session: String,
        payload: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    SendChatMessage {
        room_id: String,
        session: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    SendReaction { room_id: String, reaction: String },
    #[serde(rename_all = "camelCase")]
    MediaState {
        room_id: String,
        session: String,
        muted: bool,
        video_off: bool,
    },
    #[serde(rename_all = "camelCase")]
    StartRounds { room_id: String },
    #[serde(rename_all = "camelCase")]
    RestartRounds { room_id: String },
    #[serde(rename_all = "camelCase")]
    GetCurrentRound { room_id: String },
}

/// Events sent by the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: String },
    RoomError { message: String },
    #[serde(rename_all = "camelCase")]
    MatchFound { room_id: String },
    /// Sent to a joining participant: the peers it must initiate toward.
    #[serde(rename_all = "camelCase")]
    ExistingParticipants { participant_sessions: Vec<String> },
    /// Sent to a joining spectator: the full participant list.
    #[serde(rename_all = "camelCase")]
    CurrentParticipants { participant_sessions: Vec<String> },
    UserJoined { session: String },
    UserLeft { session: String },
    #[serde(rename_all = "camelCase")]
    Offer {
        from_session: String,
        payload: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    Answer {
        from_session: String,
        payload: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    Candidate {
        from_session: String,
        payload: serde_json::Value,
    },
    ChatHistory { history: Vec<ChatEntryPayload> },
    NewChatMessage { message: ChatEntryPayload },
    NewReaction { session: String, reaction: String },
    #[serde(rename_all = "camelCase")]
    MediaStateUpdate {
        session: String,
        muted: bool,
        video_off: bool,
    },
    ViewerCountUpdate { count: usize },
    ActiveRoomsUpdate { rooms: Vec<RoomSummaryPayload> },
    MainStageStatus(MainStagePayload),
    MainStageUpdate(MainStagePayload),
    RoundStart(RoundPayload),
    #[serde(rename_all = "camelCase")]
    RoundEnd { room_id: String, message: String },
    #[serde(rename_all = "camelCase")]
    CurrentRound {
        room_id: String,
        round: Option<RoundPayload>,
    },
    RoundsError { message: String },
}

/// One chat log entry as seen on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntryPayload {
    pub id: String,
    pub sender_session: String,
    pub text: String,
    /// RFC 3339
    pub timestamp: String,
}

/// Lobby summary of one active room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryPayload {
    pub room_id: String,
    pub viewer_count: usize,
}

/// Featured room status. Both fields are `null` when nothing is featured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainStagePayload {
    pub room_id: Option<String>,
    /// Unix milliseconds
    pub ends_at: Option<i64>,
}

/// The round currently running in a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPayload {
    pub room_id: String,
    pub title: String,
    pub prompt: String,
    /// Unix milliseconds
    pub ends_at: i64,
    /// 0-based
    pub index: usize,
    pub total: usize,
}

/// Kind of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Offer / answer payload carried inside `offer` and `answer` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Connectivity candidate payload carried inside `candidate` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}

impl ClientEvent {
    /// Parse one text frame
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerEvent {
    /// Parse one text frame
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_room_uses_kebab_case_tag_and_camel_case_fields() {
        // テスト項目: join-room イベントが type タグと camelCase フィールドで表現される
        // given (前提条件):
        let event = ClientEvent::JoinRoom {
            room_id: "abc".to_string(),
            session: "s1".to_string(),
        };

        // when (操作):
        let value = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({"type": "join-room", "roomId": "abc", "session": "s1"})
        );
    }

    #[test]
    fn test_unit_event_parses_from_type_only() {
        // テスト項目: ペイロードを持たないイベントが type のみで解析できる
        // given (前提条件):
        let text = r#"{"type":"join-lobby"}"#;

        // when (操作):
        let event = ClientEvent::from_json(text).unwrap();

        // then (期待する結果):
        assert_eq!(event, ClientEvent::JoinLobby);
    }

    #[test]
    fn test_offer_payload_is_kept_opaque() {
        // テスト項目: offer の payload が任意の JSON のまま保持される
        // given (前提条件):
        let text = r#"{"type":"offer","toSession":"s2","payload":{"type":"offer","sdp":"v=0","extra":[1,2]}}"#;

        // when (操作):
        let event = ClientEvent::from_json(text).unwrap();

        // then (期待する結果):
        match event {
            ClientEvent::Offer {
                to_session,
                payload,
            } => {
                assert_eq!(to_session, "s2");
                assert_eq!(payload["extra"], json!([1, 2]));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_main_stage_status_serializes_nulls_when_empty() {
        // テスト項目: メインステージが空のとき roomId / endsAt が null になる
        // given (前提条件):
        let event = ServerEvent::MainStageStatus(MainStagePayload {
            room_id: None,
            ends_at: None,
        });

        // when (操作):
        let value = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({"type": "main-stage-status", "roomId": null, "endsAt": null})
        );
    }

    #[test]
    fn test_round_start_flattens_round_fields() {
        // テスト項目: round-start がラウンド情報をトップレベルに展開して送られる
        // given (前提条件):
        let event = ServerEvent::RoundStart(RoundPayload {
            room_id: "abc".to_string(),
            title: "Round 1 · Icebreaker".to_string(),
            prompt: "Two truths and a lie. Go!".to_string(),
            ends_at: 1000,
            index: 0,
            total: 3,
        });

        // when (操作):
        let value = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "round-start");
        assert_eq!(value["endsAt"], 1000);
        assert_eq!(value["total"], 3);
    }

    #[test]
    fn test_ice_candidate_field_names() {
        // テスト項目: ICE candidate が sdpMid / sdpMLineIndex で表現される
        // given (前提条件):
        let candidate = IceCandidate {
            candidate: "candidate:1".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        };

        // when (操作):
        let value = serde_json::to_value(&candidate).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({"candidate": "candidate:1", "sdpMid": "0", "sdpMLineIndex": 0})
        );
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        // テスト項目: 未知の type を持つフレームは解析エラーになる
        // given (前提条件):
        let text = r#"{"type":"vote-in-poll","roomId":"abc"}"#;

        // when (操作):
        let result = ClientEvent::from_json(text);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
