//! Negotiation error types.

use thiserror::Error;

use kupid_shared::protocol::SdpKind;

use super::{
    media::MediaError,
    state::{LinkEvent, LinkState},
};

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The event is not valid in the link's current state (e.g. a stale answer)
    #[error("invalid transition from {from:?} on {event:?}")]
    InvalidTransition { from: LinkState, event: LinkEvent },

    /// Discarding the pending local offer failed; the link must be recreated
    #[error("rollback failed: {0}")]
    RollbackFailed(MediaError),

    #[error(transparent)]
    Media(#[from] MediaError),

    /// An `offer` event carried an answer or vice versa
    #[error("expected {expected:?} description, got {actual:?}")]
    UnexpectedKind { expected: SdpKind, actual: SdpKind },

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}
