//! Error types for the Kupid client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect refused, socket dropped)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Unrecoverable misuse such as an invalid session id or URL
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A line typed at the prompt could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}
