//! UseCase layer
//!
//! 全ての状態変更は単一の `Coordinator`（アクター）が 1 コマンドずつ処理します。
//! WebSocket ハンドラ・HTTP ハンドラ・タイマーは `CoordinatorHandle` 経由で
//! コマンドを送るだけで、レジストリに直接触れることはありません。
//!
//! 機能ごとの処理は `Coordinator` への `impl` ブロックとしてファイルを分けています。

mod chat;
pub mod coordinator;
pub mod error;
mod lobby;
mod main_stage;
mod matchmaking;
pub mod query;
mod relay;
mod room_membership;
mod rounds;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{Command, Coordinator, CoordinatorConfig, CoordinatorHandle};
pub use error::CoordinatorError;
pub use query::{Query, RoomSnapshot};
pub use timer::{TimerKey, TimerScheduler};
