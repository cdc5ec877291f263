//! SessionRegistry
//!
//! 接続（ソケット）とクライアント指定のセッション ID の対応表。
//! 「この接続は誰か」「このセッションへはどの接続で届くか」の唯一の情報源です。
//!
//! ## 再接続時の扱い
//!
//! 同じセッションが一時的に複数の接続を持つことがある（古いソケットの切断が
//! まだ検知されていない間）。`resolve` は常に最後に登録された接続を返す
//! （last-register-wins）。最新の接続が `forget` された場合、まだ生きている
//! 同じセッションの別の接続があればそちらにフォールバックする。

use std::collections::HashMap;

use super::value_object::{ConnectionId, SessionId};

#[derive(Debug, Default)]
pub struct SessionRegistry {
    by_connection: HashMap<ConnectionId, SessionId>,
    latest: HashMap<SessionId, ConnectionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続にセッションを登録する（冪等、同じ接続への再登録は上書き）
    pub fn register(&mut self, connection: ConnectionId, session: SessionId) {
        if let Some(previous) = self.by_connection.get(&connection).cloned()
            && previous != session
        {
            // この接続が別のセッションとして登録し直した
            self.forget(&connection);
        }
        self.by_connection
            .insert(connection.clone(), session.clone());
        self.latest.insert(session, connection);
    }

    /// セッションに届く最新の接続
    pub fn resolve(&self, session: &SessionId) -> Option<&ConnectionId> {
        self.latest.get(session)
    }

    /// 接続に登録されたセッション
    pub fn session_of(&self, connection: &ConnectionId) -> Option<&SessionId> {
        self.by_connection.get(connection)
    }

    /// 接続の登録を削除し、登録されていたセッションを返す
    pub fn forget(&mut self, connection: &ConnectionId) -> Option<SessionId> {
        let session = self.by_connection.remove(connection)?;

        if self.latest.get(&session) == Some(connection) {
            let fallback = self
                .by_connection
                .iter()
                .find(|(_, s)| **s == session)
                .map(|(c, _)| c.clone());
            match fallback {
                Some(other) => {
                    self.latest.insert(session.clone(), other);
                }
                None => {
                    self.latest.remove(&session);
                }
            }
        }

        Some(session)
    }

    /// 登録済みの接続数
    pub fn connection_count(&self) -> usize {
        self.by_connection.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(value: &str) -> SessionId {
        SessionId::new(value.to_string()).unwrap()
    }

    #[test]
    fn test_register_and_resolve() {
        // テスト項目: 登録したセッションが接続に解決される
        // given (前提条件):
        let mut registry = SessionRegistry::new();

        // when (操作):
        registry.register(ConnectionId::new("c1"), session("s1"));

        // then (期待する結果):
        assert_eq!(
            registry.resolve(&session("s1")),
            Some(&ConnectionId::new("c1"))
        );
        assert_eq!(
            registry.session_of(&ConnectionId::new("c1")),
            Some(&session("s1"))
        );
    }

    #[test]
    fn test_register_is_idempotent() {
        // テスト項目: 同じ接続・セッションの再登録で状態が変わらない
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(ConnectionId::new("c1"), session("s1"));

        // when (操作):
        registry.register(ConnectionId::new("c1"), session("s1"));

        // then (期待する結果):
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(
            registry.resolve(&session("s1")),
            Some(&ConnectionId::new("c1"))
        );
    }

    #[test]
    fn test_last_register_wins_for_session() {
        // テスト項目: 同じセッションの新しい接続が resolve の結果になる
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(ConnectionId::new("old"), session("s1"));

        // when (操作):
        registry.register(ConnectionId::new("new"), session("s1"));

        // then (期待する結果):
        assert_eq!(
            registry.resolve(&session("s1")),
            Some(&ConnectionId::new("new"))
        );
    }

    #[test]
    fn test_forget_stale_connection_keeps_latest() {
        // テスト項目: 古い接続の削除では最新の接続の解決結果が変わらない
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(ConnectionId::new("old"), session("s1"));
        registry.register(ConnectionId::new("new"), session("s1"));

        // when (操作):
        let forgotten = registry.forget(&ConnectionId::new("old"));

        // then (期待する結果):
        assert_eq!(forgotten, Some(session("s1")));
        assert_eq!(
            registry.resolve(&session("s1")),
            Some(&ConnectionId::new("new"))
        );
    }

    #[test]
    fn test_forget_latest_falls_back_to_live_connection() {
        // テスト項目: 最新の接続を削除すると、生きている別の接続にフォールバックする
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(ConnectionId::new("old"), session("s1"));
        registry.register(ConnectionId::new("new"), session("s1"));

        // when (操作):
        registry.forget(&ConnectionId::new("new"));

        // then (期待する結果):
        assert_eq!(
            registry.resolve(&session("s1")),
            Some(&ConnectionId::new("old"))
        );
    }

    #[test]
    fn test_forget_last_connection_removes_session() {
        // テスト項目: 最後の接続を削除するとセッションは解決できなくなる
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(ConnectionId::new("c1"), session("s1"));

        // when (操作):
        registry.forget(&ConnectionId::new("c1"));

        // then (期待する結果):
        assert_eq!(registry.resolve(&session("s1")), None);
        assert_eq!(registry.forget(&ConnectionId::new("c1")), None);
    }

    #[test]
    fn test_reregister_connection_as_other_session() {
        // テスト項目: 接続を別のセッションで登録し直すと古いセッションは解決できなくなる
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(ConnectionId::new("c1"), session("s1"));

        // when (操作):
        registry.register(ConnectionId::new("c1"), session("s2"));

        // then (期待する結果):
        assert_eq!(registry.resolve(&session("s1")), None);
        assert_eq!(
            registry.resolve(&session("s2")),
            Some(&ConnectionId::new("c1"))
        );
    }
}
