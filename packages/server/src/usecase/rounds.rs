//! UseCase: ラウンド（時間制限付きのお題）の進行
//!
//! - `start-rounds`: 参加者が 2 人以上いるときだけ開始できる
//! - 各ラウンドの期限でタイマーが発火し、次のラウンドへ進む（最後なら `round-end`）
//! - 参加者が 2 人未満になった・ルームが消えた場合は `stop_rounds` で即座に破棄
//!
//! タイマーの発火時には、ルームと参加者数を再確認してから進める。

use std::time::Duration;

use kupid_shared::{
    protocol::{RoundPayload, ServerEvent},
    time::deadline_after,
};

use crate::domain::{ConnectionId, RoomId, RoundState, entity::MAX_PARTICIPANTS, select_rounds};

use super::{coordinator::Coordinator, timer::TimerKey};

const NOT_ENOUGH_PARTICIPANTS: &str = "Need at least 2 participants to start rounds";
const ALREADY_RUNNING: &str = "Rounds are already in progress";
const ALL_ROUNDS_COMPLETE: &str = "All rounds complete! 🎉";

/// 現在のラウンドをワイヤー形式に変換
fn round_payload(room_id: &RoomId, state: &RoundState) -> Option<RoundPayload> {
    let round = state.current()?;
    Some(RoundPayload {
        room_id: room_id.as_str().to_string(),
        title: round.title.clone(),
        prompt: round.prompt.clone(),
        ends_at: state.ends_at,
        index: state.current_index,
        total: state.total(),
    })
}

impl Coordinator {
    pub(super) async fn start_rounds(&mut self, connection: &ConnectionId, room_id: String) {
        let Ok(room_id) = RoomId::try_from(room_id) else {
            return;
        };
        if self.rooms.participant_count(&room_id) < MAX_PARTICIPANTS {
            self.send_rounds_error(connection, NOT_ENOUGH_PARTICIPANTS)
                .await;
            return;
        }
        if self.rounds.contains_key(&room_id) {
            self.send_rounds_error(connection, ALREADY_RUNNING).await;
            return;
        }
        self.begin_rounds(room_id).await;
    }

    pub(super) async fn restart_rounds(&mut self, connection: &ConnectionId, room_id: String) {
        let Ok(room_id) = RoomId::try_from(room_id) else {
            return;
        };
        if self.rooms.participant_count(&room_id) < MAX_PARTICIPANTS {
            self.send_rounds_error(connection, NOT_ENOUGH_PARTICIPANTS)
                .await;
            return;
        }
        self.stop_rounds(&room_id);
        self.begin_rounds(room_id).await;
    }

    pub(super) async fn send_current_round(&self, connection: &ConnectionId, room_id: String) {
        let Ok(room_id) = RoomId::try_from(room_id) else {
            return;
        };
        let round = self
            .rounds
            .get(&room_id)
            .and_then(|state| round_payload(&room_id, state));
        let event = ServerEvent::CurrentRound {
            room_id: room_id.into_string(),
            round,
        };
        self.send(connection, &event).await;
    }

    /// ラウンドを止めて状態を破棄する（状態がなければ何もしない）
    pub(super) fn stop_rounds(&mut self, room_id: &RoomId) {
        self.timers.cancel(&TimerKey::Round(room_id.clone()));
        if self.rounds.remove(room_id).is_some() {
            tracing::info!(room_id = %room_id, "rounds stopped");
        }
    }

    /// ラウンドのタイマーが発火した
    pub(super) async fn on_round_expired(&mut self, room_id: RoomId) {
        if self.rooms.participant_count(&room_id) < MAX_PARTICIPANTS {
            tracing::debug!(room_id = %room_id, "round timer fired without two participants");
            self.stop_rounds(&room_id);
            return;
        }
        let Some(next) = self.rounds.get(&room_id).map(|s| s.current_index + 1) else {
            return;
        };
        self.schedule_round(room_id, next).await;
    }

    async fn begin_rounds(&mut self, room_id: RoomId) {
        let selected = select_rounds(
            &self.config.catalogue,
            self.config.rounds_per_session,
            self.config.randomize_prompts,
        );
        if selected.is_empty() {
            tracing::warn!(room_id = %room_id, "no round prompts configured");
            return;
        }
        tracing::info!(room_id = %room_id, total = selected.len(), "rounds started");
        self.rounds
            .insert(room_id.clone(), RoundState::new(selected));
        self.schedule_round(room_id, 0).await;
    }

    async fn schedule_round(&mut self, room_id: RoomId, index: usize) {
        let now = self.now();
        let base = self.config.round_base_duration_secs;
        let Some(state) = self.rounds.get_mut(&room_id) else {
            return;
        };

        if index >= state.total() {
            self.rounds.remove(&room_id);
            self.timers.cancel(&TimerKey::Round(room_id.clone()));
            tracing::info!(room_id = %room_id, "all rounds complete");
            let event = ServerEvent::RoundEnd {
                room_id: room_id.as_str().to_string(),
                message: ALL_ROUNDS_COMPLETE.to_string(),
            };
            self.broadcast_room(&room_id, &event).await;
            return;
        }

        let duration = Duration::from_secs(state.rounds[index].effective_duration_secs(base));
        state.current_index = index;
        state.ends_at = deadline_after(now, duration);
        let payload = round_payload(&room_id, state);

        tracing::info!(room_id = %room_id, round = index + 1, total = state.total(), "round started");
        if let Some(payload) = payload {
            self.broadcast_room(&room_id, &ServerEvent::RoundStart(payload))
                .await;
        }
        self.timers
            .arm(TimerKey::Round(room_id), duration);
    }

    async fn send_rounds_error(&self, connection: &ConnectionId, message: &str) {
        let event = ServerEvent::RoundsError {
            message: message.to_string(),
        };
        self.send(connection, &event).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use kupid_shared::protocol::{ClientEvent, ServerEvent};

    use crate::usecase::test_support::{NOW, TestClient, TestHarness};

    fn start(room_id: &str) -> ClientEvent {
        ClientEvent::StartRounds {
            room_id: room_id.to_string(),
        }
    }

    async fn full_room(harness: &TestHarness) -> (TestClient, TestClient) {
        let mut s1 = harness.connect("c1");
        let mut s2 = harness.connect("c2");
        s1.join("abc", "S1");
        s2.join("abc", "S2");
        s1.drain().await;
        s2.drain().await;
        (s1, s2)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rounds_requires_two_participants() {
        // テスト項目: 参加者が 1 人のときは rounds-error が返る
        // given (前提条件):
        let harness = TestHarness::start();
        let mut s1 = harness.connect("c1");
        s1.join("abc", "S1");
        s1.drain().await;

        // when (操作):
        s1.send(start("abc"));

        // then (期待する結果):
        assert_eq!(
            s1.recv().await,
            ServerEvent::RoundsError {
                message: "Need at least 2 participants to start rounds".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rounds_advance_and_complete() {
        // テスト項目: ラウンドが期限ごとに進み、最後に round-end が届く
        // given (前提条件):
        let harness = TestHarness::start();
        let (mut s1, _s2) = full_room(&harness).await;

        // when (操作):
        s1.send(start("abc"));

        // then (期待する結果):
        let mut starts = Vec::new();
        loop {
            match s1.recv().await {
                ServerEvent::RoundStart(round) => starts.push(round),
                ServerEvent::RoundEnd { message, .. } => {
                    assert_eq!(message, "All rounds complete! 🎉");
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(starts.len(), 3);
        assert_eq!(starts[0].title, "Round 1 · Icebreaker");
        assert_eq!(starts[0].ends_at, NOW + 60_000);
        assert_eq!(
            starts.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(starts.iter().all(|r| r.total == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_reports_already_running() {
        // テスト項目: 進行中にもう一度 start-rounds すると rounds-error が返る
        // given (前提条件):
        let harness = TestHarness::start();
        let (mut s1, _s2) = full_room(&harness).await;
        s1.send(start("abc"));
        s1.drain().await;

        // when (操作):
        s1.send(start("abc"));

        // then (期待する結果):
        assert_eq!(
            s1.recv().await,
            ServerEvent::RoundsError {
                message: "Rounds are already in progress".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_participant_leave_stops_rounds() {
        // テスト項目: 参加者が抜けるとラウンドが止まり、以降 round-start も round-end も届かない
        // given (前提条件):
        let harness = TestHarness::start();
        let (s1, mut s2) = full_room(&harness).await;
        s1.send(start("abc"));
        s2.drain().await;

        // when (操作):
        s1.disconnect();
        s2.drain().await;
        tokio::time::sleep(Duration::from_secs(300)).await;

        // then (期待する結果):
        let events = s2.drain().await;
        assert!(events.iter().all(|e| !matches!(
            e,
            ServerEvent::RoundStart(_) | ServerEvent::RoundEnd { .. }
        )));
        s2.send(ClientEvent::GetCurrentRound {
            room_id: "abc".to_string(),
        });
        assert_eq!(
            s2.recv().await,
            ServerEvent::CurrentRound {
                room_id: "abc".to_string(),
                round: None
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_current_round_while_running() {
        // テスト項目: 進行中は get-current-round に現在のラウンドが返る
        // given (前提条件):
        let harness = TestHarness::start();
        let (mut s1, _s2) = full_room(&harness).await;
        s1.send(start("abc"));
        s1.drain().await;

        // when (操作):
        s1.send(ClientEvent::GetCurrentRound {
            room_id: "abc".to_string(),
        });

        // then (期待する結果):
        match s1.recv().await {
            ServerEvent::CurrentRound {
                round: Some(round), ..
            } => {
                assert_eq!(round.index, 0);
                assert_eq!(round.total, 3);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_rounds_begins_from_first() {
        // テスト項目: restart-rounds で最初のラウンドからやり直される
        // given (前提条件):
        let harness = TestHarness::start();
        let (mut s1, _s2) = full_room(&harness).await;
        s1.send(start("abc"));
        s1.recv().await;
        let second = s1.recv().await;
        assert!(matches!(second, ServerEvent::RoundStart(ref r) if r.index == 1));

        // when (操作):
        s1.send(ClientEvent::RestartRounds {
            room_id: "abc".to_string(),
        });

        // then (期待する結果):
        assert!(matches!(s1.recv().await, ServerEvent::RoundStart(r) if r.index == 0));
    }
}
