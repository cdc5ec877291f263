//! Infrastructure layer
//!
//! ドメイン層の trait の具体的な実装と、HTTP API の DTO を提供します。

pub mod dto;
pub mod message_pusher;
