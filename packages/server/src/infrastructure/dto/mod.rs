//! Data Transfer Objects
//!
//! HTTP API のレスポンス形式です。WebSocket のイベントは
//! `kupid_shared::protocol` で定義されています。

pub mod conversion;
pub mod http;
