//! UseCase: メインステージ（注目ルーム）のローテーション
//!
//! ```text
//! unset -> set（昇格）-> cleared（期限切れ or ルームが先に消えた）-> キューから再マッチング
//! ```
//!
//! 状態が変わるたびに `main-stage-status` と `main-stage-update` をロビーに送る。

use kupid_shared::{protocol::ServerEvent, time::deadline_after};

use crate::domain::RoomId;

use super::{coordinator::Coordinator, timer::TimerKey};

impl Coordinator {
    /// ルームをメインステージに昇格させる
    pub(super) async fn promote(&mut self, room_id: RoomId) {
        self.timers.cancel(&TimerKey::MainStage);

        let duration = self.config.main_stage_duration;
        let ends_at = deadline_after(self.now(), duration);
        tracing::info!(room_id = %room_id, ends_at, "room promoted to main stage");
        self.main_stage.feature(room_id, ends_at);
        self.broadcast_main_stage().await;

        self.timers.arm(TimerKey::MainStage, duration);
    }

    /// メインステージのタイマーが発火した
    pub(super) async fn on_main_stage_expired(&mut self) {
        tracing::info!(
            room_id = ?self.main_stage.room_id.as_ref().map(|id| id.as_str()),
            "main stage expired"
        );
        self.main_stage.clear();
        self.broadcast_main_stage().await;
        self.try_match().await;
    }

    /// 注目ルームが期限前に消えたときに即座にクリアする
    pub(super) async fn end_main_stage(&mut self) {
        self.timers.cancel(&TimerKey::MainStage);
        tracing::info!(
            room_id = ?self.main_stage.room_id.as_ref().map(|id| id.as_str()),
            "main stage cleared early"
        );
        self.main_stage.clear();
        self.broadcast_main_stage().await;
        self.try_match().await;
    }

    async fn broadcast_main_stage(&self) {
        let payload = self.main_stage_payload();
        self.broadcast_lobby(&ServerEvent::MainStageStatus(payload.clone()))
            .await;
        self.broadcast_lobby(&ServerEvent::MainStageUpdate(payload))
            .await;
    }
}
