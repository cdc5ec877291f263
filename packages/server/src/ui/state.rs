//! Shared application state.

use crate::usecase::CoordinatorHandle;

/// Shared application state
///
/// ハンドラは状態を直接持たず、全て Coordinator へのコマンドとして送る。
#[derive(Clone)]
pub struct AppState {
    pub coordinator: CoordinatorHandle,
}
