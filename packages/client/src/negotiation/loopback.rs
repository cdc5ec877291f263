//! Synthetic media engine.
//!
//! Tracks the signaling state the way a real peer connection does (offers
//! cannot be applied over a pending local offer without a rollback, candidates
//! need a remote description) and reports a connected transport plus a remote
//! track only once the pair's exchange completes. The offering side completes
//! when the answer is applied and then gathers a peer-reflexive candidate; the
//! answering side completes when that candidate reaches it. An answer that is
//! created but never applied by the peer leaves both sides without media.
//! The headless client uses it in place of real capture devices; tests use
//! [`LoopbackRecorder`] to observe what the negotiation layer did.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use kupid_shared::protocol::{IceCandidate, SdpKind, SessionDescription};

use super::media::{
    LinkContext, MediaError, MediaEvent, MediaEventKind, MediaEventSender, PeerConnection,
    PeerConnectionFactory,
};

#[derive(Debug, Clone)]
pub struct LoopbackOptions {
    /// Report connected + remote track once an exchange completes
    pub auto_connect: bool,
    /// Rollback always fails (simulates a corrupted signaling state)
    pub fail_rollback: bool,
    /// Local candidates gathered after each local description
    pub candidates_per_description: usize,
}

impl Default for LoopbackOptions {
    fn default() -> Self {
        Self {
            auto_connect: true,
            fail_rollback: false,
            candidates_per_description: 1,
        }
    }
}

/// Record of everything the loopback engines were asked to do
#[derive(Debug, Default)]
pub struct EngineLog {
    pub created: Vec<LinkContext>,
    /// (remote, candidate) in application order
    pub applied_candidates: Vec<(String, String)>,
    pub rollbacks: usize,
    /// Remote answers applied by offering sides
    pub answers_applied: usize,
    pub closed: Vec<(String, u64)>,
}

#[derive(Debug, Clone, Default)]
pub struct LoopbackRecorder {
    log: Arc<Mutex<EngineLog>>,
}

impl LoopbackRecorder {
    pub fn log(&self) -> MutexGuard<'_, EngineLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Links created toward `remote`
    pub fn created_for(&self, remote: &str) -> Vec<LinkContext> {
        self.log()
            .created
            .iter()
            .filter(|c| c.remote == remote)
            .cloned()
            .collect()
    }

    pub fn candidates_for(&self, remote: &str) -> Vec<String> {
        self.log()
            .applied_candidates
            .iter()
            .filter(|(r, _)| r == remote)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoopbackFactory {
    options: LoopbackOptions,
    recorder: LoopbackRecorder,
}

impl LoopbackFactory {
    pub fn new(options: LoopbackOptions) -> Self {
        Self {
            options,
            recorder: LoopbackRecorder::default(),
        }
    }

    pub fn recorder(&self) -> LoopbackRecorder {
        self.recorder.clone()
    }
}

impl PeerConnectionFactory for LoopbackFactory {
    fn create(&self, context: LinkContext, events: MediaEventSender) -> Box<dyn PeerConnection> {
        self.recorder.log().created.push(context.clone());
        Box::new(LoopbackConnection {
            context,
            options: self.options.clone(),
            recorder: self.recorder.clone(),
            events,
            signaling: Signaling::Stable,
            has_remote_description: false,
            answered: false,
            connected: false,
            closed: false,
            descriptions: 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signaling {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
}

struct LoopbackConnection {
    context: LinkContext,
    options: LoopbackOptions,
    recorder: LoopbackRecorder,
    events: MediaEventSender,
    signaling: Signaling,
    has_remote_description: bool,
    /// A local answer has been set
    answered: bool,
    connected: bool,
    closed: bool,
    descriptions: usize,
}

const REFLEXIVE_MARKER: &str = "typ prflx";

impl LoopbackConnection {
    fn emit(&self, kind: MediaEventKind) {
        // 受け手がいなくなっていれば捨てる
        let _ = self.events.send(MediaEvent {
            remote: self.context.remote.clone(),
            generation: self.context.generation,
            kind,
        });
    }

    fn ensure_open(&self) -> Result<(), MediaError> {
        if self.closed {
            Err(MediaError::Closed)
        } else {
            Ok(())
        }
    }

    fn invalid_state(&self) -> MediaError {
        MediaError::InvalidState(format!("{:?}", self.signaling))
    }

    fn sdp(&self, kind: &str) -> String {
        format!(
            "v=0 loopback {} {}->{} gen={} #{}",
            kind,
            self.context.local,
            self.context.remote,
            self.context.generation,
            self.descriptions
        )
    }

    fn gather_candidates(&self) {
        for i in 0..self.options.candidates_per_description {
            self.emit(MediaEventKind::LocalCandidate(IceCandidate {
                candidate: format!(
                    "candidate:{}-{}-{} 1 udp 2130706431 127.0.0.1 {} typ host",
                    self.context.local,
                    self.context.generation,
                    self.descriptions * 10 + i,
                    50000 + i
                ),
                sdp_mid: Some("0".to_string()),
                sdp_m_line_index: Some(0),
            }));
        }
    }

    /// Peer-reflexive candidate learned from the completed exchange
    fn reflexive_candidate(&self) -> IceCandidate {
        IceCandidate {
            candidate: format!(
                "candidate:{}-{}-rx 1 udp 1845501695 127.0.0.1 {} {}",
                self.context.local,
                self.context.generation,
                51000 + self.context.generation,
                REFLEXIVE_MARKER
            ),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        }
    }

    fn report_media(&mut self) {
        if self.connected {
            return;
        }
        self.connected = true;
        self.emit(MediaEventKind::TrackReceived);
        self.emit(MediaEventKind::Connected);
    }
}

#[async_trait]
impl PeerConnection for LoopbackConnection {
    async fn create_offer(&mut self) -> Result<SessionDescription, MediaError> {
        self.ensure_open()?;
        if self.signaling != Signaling::Stable {
            return Err(self.invalid_state());
        }
        self.descriptions += 1;
        Ok(SessionDescription::offer(self.sdp("offer")))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription, MediaError> {
        self.ensure_open()?;
        if self.signaling != Signaling::HaveRemoteOffer {
            return Err(self.invalid_state());
        }
        self.descriptions += 1;
        Ok(SessionDescription::answer(self.sdp("answer")))
    }

    async fn set_local_description(&mut self, desc: SessionDescription) -> Result<(), MediaError> {
        self.ensure_open()?;
        match (desc.kind, self.signaling) {
            (SdpKind::Offer, Signaling::Stable) => {
                self.signaling = Signaling::HaveLocalOffer;
                self.gather_candidates();
            }
            (SdpKind::Answer, Signaling::HaveRemoteOffer) => {
                self.signaling = Signaling::Stable;
                self.answered = true;
                self.gather_candidates();
            }
            _ => return Err(self.invalid_state()),
        }
        Ok(())
    }

    async fn set_remote_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), MediaError> {
        self.ensure_open()?;
        match (desc.kind, self.signaling) {
            (SdpKind::Offer, Signaling::Stable) => {
                self.signaling = Signaling::HaveRemoteOffer;
            }
            (SdpKind::Answer, Signaling::HaveLocalOffer) => {
                self.signaling = Signaling::Stable;
                self.recorder.log().answers_applied += 1;
                if self.options.auto_connect {
                    self.emit(MediaEventKind::LocalCandidate(self.reflexive_candidate()));
                    self.report_media();
                }
            }
            _ => return Err(self.invalid_state()),
        }
        self.has_remote_description = true;
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), MediaError> {
        self.ensure_open()?;
        if !self.has_remote_description {
            return Err(MediaError::Engine(
                "remote description is not set".to_string(),
            ));
        }
        let reflexive = candidate.candidate.contains(REFLEXIVE_MARKER);
        self.recorder
            .log()
            .applied_candidates
            .push((self.context.remote.clone(), candidate.candidate));
        if reflexive && self.answered && self.options.auto_connect {
            self.report_media();
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MediaError> {
        self.ensure_open()?;
        if self.options.fail_rollback {
            return Err(MediaError::Engine("rollback rejected".to_string()));
        }
        if self.signaling != Signaling::HaveLocalOffer {
            return Err(self.invalid_state());
        }
        self.signaling = Signaling::Stable;
        self.recorder.log().rollbacks += 1;
        Ok(())
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.recorder
                .log()
                .closed
                .push((self.context.remote.clone(), self.context.generation));
        }
    }
}
