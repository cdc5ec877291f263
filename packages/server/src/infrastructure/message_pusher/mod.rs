//! `MessagePusher` の実装
//!
//! Coordinator が送るイベントは JSON 文字列として接続ごとのチャンネルに積まれ、
//! 各 WebSocket の送信タスクがそれを書き出します。

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
