//! Media engine seam.
//!
//! The negotiation layer only needs the offer/answer/candidate surface of a
//! peer connection. Real engines (browser, webrtc stacks) and the synthetic
//! [`LoopbackFactory`](super::loopback::LoopbackFactory) implement these traits.

use async_trait::async_trait;
use kupid_shared::protocol::{IceCandidate, SessionDescription};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("operation not valid in signaling state {0}")]
    InvalidState(String),
    #[error("connection is closed")]
    Closed,
    #[error("{0}")]
    Engine(String),
}

/// Local media direction of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDirection {
    /// Participant: sends local tracks and receives the remote ones
    SendRecv,
    /// Spectator: receive only
    RecvOnly,
}

/// Identifies the link an engine callback belongs to
///
/// `generation` changes every time a link to the same remote is recreated, so
/// callbacks from a discarded connection can be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkContext {
    pub local: String,
    pub remote: String,
    pub generation: u64,
    pub direction: MediaDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEventKind {
    /// A local connectivity candidate to forward to the remote
    LocalCandidate(IceCandidate),
    /// A remote track arrived
    TrackReceived,
    /// The transport is connected
    Connected,
    /// The transport failed terminally
    Failed,
    /// The transport was closed by the engine
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEvent {
    pub remote: String,
    pub generation: u64,
    pub kind: MediaEventKind,
}

pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;

/// One peer connection as seen by the negotiation layer
#[async_trait]
pub trait PeerConnection: Send {
    async fn create_offer(&mut self) -> Result<SessionDescription, MediaError>;
    async fn create_answer(&mut self) -> Result<SessionDescription, MediaError>;
    async fn set_local_description(&mut self, desc: SessionDescription) -> Result<(), MediaError>;
    async fn set_remote_description(&mut self, desc: SessionDescription)
    -> Result<(), MediaError>;
    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), MediaError>;
    /// Discard the pending local offer
    async fn rollback(&mut self) -> Result<(), MediaError>;
    async fn close(&mut self);
}

/// Creates peer connections; engine callbacks are reported through `events`
pub trait PeerConnectionFactory: Send + Sync {
    fn create(&self, context: LinkContext, events: MediaEventSender) -> Box<dyn PeerConnection>;
}
