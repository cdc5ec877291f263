//! キャンセル可能なタイマー
//!
//! タイマーは `(スコープ, 目的)` のキーごとに高々 1 つだけ存在する。
//! 同じキーで `arm` すると前のタイマーは中断される。
//!
//! 発火したタイマーは `Command::TimerFired { key, token }` として Coordinator に
//! 届く。中断と発火がすれ違った場合に備え、Coordinator は `take_if_current` で
//! トークンが現在のものかを確認してから処理する（古いトークンは無視する）。

use std::{collections::HashMap, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::domain::RoomId;

use super::coordinator::Command;

/// タイマーの目的
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// メインステージの表示期限（プロセス全体で 1 つ）
    MainStage,
    /// ルームの現在のラウンドの期限
    Round(RoomId),
}

struct ArmedTimer {
    token: u64,
    handle: JoinHandle<()>,
}

pub struct TimerScheduler {
    armed: HashMap<TimerKey, ArmedTimer>,
    next_token: u64,
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl TimerScheduler {
    /// # Arguments
    ///
    /// * `commands` - 発火を通知する Coordinator のコマンドチャンネル（弱参照）
    pub fn new(commands: mpsc::WeakUnboundedSender<Command>) -> Self {
        Self {
            armed: HashMap::new(),
            next_token: 0,
            commands,
        }
    }

    /// タイマーをセットする（同じキーの既存タイマーは中断）
    ///
    /// # Returns
    ///
    /// 発火時に `TimerFired` に載るトークン
    pub fn arm(&mut self, key: TimerKey, delay: Duration) -> u64 {
        self.cancel(&key);

        self.next_token += 1;
        let token = self.next_token;
        let commands = self.commands.clone();
        let fired_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::TimerFired {
                    key: fired_key,
                    token,
                });
            }
        });

        tracing::debug!(?key, token, ?delay, "timer armed");
        self.armed.insert(key, ArmedTimer { token, handle });
        token
    }

    /// タイマーを中断する。セットされていなければ何もしない
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        match self.armed.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                tracing::debug!(?key, token = timer.token, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// 発火したトークンが現在のものであれば登録を外して `true` を返す
    pub fn take_if_current(&mut self, key: &TimerKey, token: u64) -> bool {
        match self.armed.get(key) {
            Some(timer) if timer.token == token => {
                self.armed.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.armed.contains_key(key)
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.handle.abort();
        }
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
