//! UseCase: ネゴシエーションの中継
//!
//! offer / answer / candidate の `payload` を中身を見ずに宛先セッションの
//! 最新の接続へ転送する。宛先が解決できなければ黙って捨てる
//! （相手は切断済みで、回復はクライアント側の再試行に任せる）。

use kupid_shared::protocol::ServerEvent;

use crate::domain::{ConnectionId, SessionId};

use super::coordinator::Coordinator;

/// 中継するネゴシエーションメッセージの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RelayKind {
    Offer,
    Answer,
    Candidate,
}

impl RelayKind {
    fn into_event(self, from_session: String, payload: serde_json::Value) -> ServerEvent {
        match self {
            RelayKind::Offer => ServerEvent::Offer {
                from_session,
                payload,
            },
            RelayKind::Answer => ServerEvent::Answer {
                from_session,
                payload,
            },
            RelayKind::Candidate => ServerEvent::Candidate {
                from_session,
                payload,
            },
        }
    }
}

impl Coordinator {
    pub(super) async fn relay(
        &mut self,
        connection: &ConnectionId,
        kind: RelayKind,
        to_session: String,
        payload: serde_json::Value,
    ) {
        let Some(from) = self.sessions.session_of(connection).cloned() else {
            tracing::debug!(%connection, ?kind, "relay from unregistered connection dropped");
            return;
        };
        let Ok(to) = SessionId::try_from(to_session) else {
            return;
        };
        let Some(target) = self.sessions.resolve(&to).cloned() else {
            tracing::debug!(from = %from, to = %to, ?kind, "relay target not found, dropped");
            return;
        };

        tracing::debug!(from = %from, to = %to, ?kind, "relaying");
        let event = kind.into_event(from.into_string(), payload);
        self.send(&target, &event).await;
    }
}
