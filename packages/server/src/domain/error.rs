//! Domain errors

use thiserror::Error;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Session ID must not be empty")]
    EmptySessionId,

    #[error("Session ID is too long ({0} chars)")]
    SessionIdTooLong(usize),

    #[error("Room ID is required")]
    EmptyRoomId,

    #[error("Room ID is too long ({0} chars)")]
    RoomIdTooLong(usize),

    #[error("Chat message must not be blank")]
    EmptyChatText,

    #[error("Chat message is too long ({0} chars)")]
    ChatTextTooLong(usize),
}

/// メッセージ送信時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Connection '{0}' not found")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
