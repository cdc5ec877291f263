//! Domain layer
//!
//! 接続・セッション・ルーム・マッチメイキング・ラウンドの状態と、
//! その状態遷移だけを扱う層です。I/O やタイマーには依存しません。

pub mod entity;
pub mod error;
pub mod matchmaking;
pub mod message_pusher;
pub mod room_registry;
pub mod round;
pub mod session_registry;
pub mod value_object;

pub use entity::{ChatEntry, MainStage, Member, Role, Room, RoundState};
pub use error::{DomainError, MessagePushError};
pub use matchmaking::{MatchedPair, MatchmakingQueue, QueueEntry};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use room_registry::{JoinOutcome, LeaveOutcome, RoomRegistry};
pub use round::{RoundPrompt, select_rounds};
pub use session_registry::SessionRegistry;
pub use value_object::{ChatText, ConnectionId, RoomId, SessionId};
