//! UseCase 層のエラー定義

use thiserror::Error;

/// Coordinator への問い合わせに失敗した
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Coordinator が停止している（シャットダウン済み）
    #[error("Coordinator is not running")]
    Unavailable,
}
