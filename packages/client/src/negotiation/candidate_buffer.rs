//! Pending connectivity candidates per remote session.

use std::collections::HashMap;

use kupid_shared::protocol::IceCandidate;

/// Candidates that arrived before the remote description was applied
///
/// Entries are created lazily and drained in arrival order.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    pending: HashMap<String, Vec<IceCandidate>>,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, remote: &str, candidate: IceCandidate) {
        self.pending
            .entry(remote.to_string())
            .or_default()
            .push(candidate);
    }

    /// Take every buffered candidate for `remote`, oldest first
    pub fn drain(&mut self, remote: &str) -> Vec<IceCandidate> {
        self.pending.remove(remote).unwrap_or_default()
    }

    pub fn discard(&mut self, remote: &str) {
        self.pending.remove(remote);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self, remote: &str) -> usize {
        self.pending.get(remote).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
