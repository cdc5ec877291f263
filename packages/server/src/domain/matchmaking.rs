//! MatchmakingQueue
//!
//! 待機中のセッションを FIFO で 2 人ずつ組み合わせる。
//! キューはルームの状態を一切作らず、組み合わせた結果だけを返す。

use std::collections::VecDeque;

use super::value_object::{ConnectionId, SessionId};

/// キューのエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub session: SessionId,
    pub connection: ConnectionId,
}

/// マッチした 2 人（先にキューに入った方が `first`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub first: QueueEntry,
    pub second: QueueEntry,
}

#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    entries: VecDeque<QueueEntry>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 末尾に追加する。同じセッションが既にいれば何もせず `false` を返す
    pub fn enqueue(&mut self, session: SessionId, connection: ConnectionId) -> bool {
        if self.contains(&session) {
            return false;
        }
        self.entries.push_back(QueueEntry {
            session,
            connection,
        });
        true
    }

    pub fn remove_session(&mut self, session: &SessionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.session != session);
        self.entries.len() != before
    }

    /// 指定した接続が追加したエントリだけを取り除く
    pub fn remove_connection(&mut self, connection: &ConnectionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.connection != connection);
        self.entries.len() != before
    }

    /// 2 人以上待っていれば先頭の 2 人を取り出す
    pub fn pop_pair(&mut self) -> Option<MatchedPair> {
        if self.entries.len() < 2 {
            return None;
        }
        let first = self.entries.pop_front()?;
        let second = self.entries.pop_front()?;
        Some(MatchedPair { first, second })
    }

    pub fn contains(&self, session: &SessionId) -> bool {
        self.entries.iter().any(|e| &e.session == session)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(value: &str) -> SessionId {
        SessionId::new(value.to_string()).unwrap()
    }

    #[test]
    fn test_enqueue_same_session_twice_is_noop() {
        // テスト項目: 同じセッションを 2 回追加してもキューの長さは変わらない
        // given (前提条件):
        let mut queue = MatchmakingQueue::new();
        queue.enqueue(session("a"), ConnectionId::new("c1"));

        // when (操作):
        let added = queue.enqueue(session("a"), ConnectionId::new("c2"));

        // then (期待する結果):
        assert!(!added);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pop_pair_is_fifo() {
        // テスト項目: 先に並んだ 2 人が取り出される
        // given (前提条件):
        let mut queue = MatchmakingQueue::new();
        queue.enqueue(session("a"), ConnectionId::new("c1"));
        queue.enqueue(session("b"), ConnectionId::new("c2"));
        queue.enqueue(session("c"), ConnectionId::new("c3"));

        // when (操作):
        let pair = queue.pop_pair().unwrap();

        // then (期待する結果):
        assert_eq!(pair.first.session, session("a"));
        assert_eq!(pair.second.session, session("b"));
        assert_eq!(queue.len(), 1);
        assert!(queue.pop_pair().is_none());
    }

    #[test]
    fn test_remove_connection_ignores_newer_connection() {
        // テスト項目: 古い接続での削除は、新しい接続で並び直したエントリを消さない
        // given (前提条件):
        let mut queue = MatchmakingQueue::new();
        queue.enqueue(session("a"), ConnectionId::new("new"));

        // when (操作):
        let removed = queue.remove_connection(&ConnectionId::new("old"));

        // then (期待する結果):
        assert!(!removed);
        assert!(queue.contains(&session("a")));
    }

    #[test]
    fn test_remove_session() {
        // テスト項目: セッション指定でキューから外せる
        // given (前提条件):
        let mut queue = MatchmakingQueue::new();
        queue.enqueue(session("a"), ConnectionId::new("c1"));

        // when (操作):
        let removed = queue.remove_session(&session("a"));

        // then (期待する結果):
        assert!(removed);
        assert!(queue.is_empty());
    }
}
