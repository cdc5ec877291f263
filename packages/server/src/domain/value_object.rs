//! Value objects
//!
//! 識別子とチャット本文の検証済みの型です。生の `String` は
//! UI 層（WebSocket ハンドラ）でここに変換されてからドメインに渡ります。

use std::fmt;

use super::error::DomainError;

/// 識別子（セッション ID / ルーム ID）の最大文字数
pub const MAX_ID_LENGTH: usize = 128;

/// チャット本文の最大文字数
pub const MAX_CHAT_LENGTH: usize = 1000;

/// クライアントが生成するセッション識別子
///
/// ブラウザのタブ（CLI クライアントのプロセス）ごとに一度生成され、
/// トランスポートの再接続をまたいで維持される。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        let len = value.chars().count();
        if value.trim().is_empty() {
            return Err(DomainError::EmptySessionId);
        }
        if len > MAX_ID_LENGTH {
            return Err(DomainError::SessionIdTooLong(len));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ルーム識別子（ユーザー指定またはマッチング時に生成）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        let len = value.chars().count();
        if value.trim().is_empty() {
            return Err(DomainError::EmptyRoomId);
        }
        if len > MAX_ID_LENGTH {
            return Err(DomainError::RoomIdTooLong(len));
        }
        Ok(Self(value))
    }

    /// マッチング用に新しいルーム ID を生成（UUID v4）
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ソケット 1 本に対応するトランスポート接続のハンドル
///
/// サーバーが WebSocket の upgrade 時に払い出す。クライアントからは見えない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// チャット本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatText(String);

impl ChatText {
    pub fn new(value: String) -> Result<Self, DomainError> {
        let len = value.chars().count();
        if value.trim().is_empty() {
            return Err(DomainError::EmptyChatText);
        }
        if len > MAX_CHAT_LENGTH {
            return Err(DomainError::ChatTextTooLong(len));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChatText {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
