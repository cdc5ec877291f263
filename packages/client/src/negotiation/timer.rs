//! Room-scoped client timers (retry, participant-count check).
//!
//! Same contract as the server scheduler: at most one timer per key, re-arming
//! aborts the previous task, and a fired timer is acted on only if its token is
//! still current.

use std::{collections::HashMap, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientTimerKey {
    /// Bounded retry toward one remote session
    Retry(String),
    /// "No media yet, ask the server who is here"
    ParticipantCheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    pub key: ClientTimerKey,
    pub token: u64,
}

pub struct ClientTimers {
    armed: HashMap<ClientTimerKey, (u64, JoinHandle<()>)>,
    next_token: u64,
    fired: mpsc::UnboundedSender<TimerFired>,
}

impl ClientTimers {
    pub fn new(fired: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            armed: HashMap::new(),
            next_token: 0,
            fired,
        }
    }

    pub fn arm(&mut self, key: ClientTimerKey, delay: Duration) -> u64 {
        self.cancel(&key);

        self.next_token += 1;
        let token = self.next_token;
        let fired = self.fired.clone();
        let fired_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(TimerFired {
                key: fired_key,
                token,
            });
        });
        tracing::debug!(?key, token, ?delay, "client timer armed");
        self.armed.insert(key, (token, handle));
        token
    }

    pub fn cancel(&mut self, key: &ClientTimerKey) {
        if let Some((_, handle)) = self.armed.remove(key) {
            handle.abort();
        }
    }

    pub fn take_if_current(&mut self, fired: &TimerFired) -> bool {
        match self.armed.get(&fired.key) {
            Some((token, _)) if *token == fired.token => {
                self.armed.remove(&fired.key);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, key: &ClientTimerKey) -> bool {
        self.armed.contains_key(key)
    }

    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.armed.drain() {
            handle.abort();
        }
    }
}

impl Drop for ClientTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
