//! Per-peer negotiation states and their transition table.

use super::error::NegotiationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    /// Local offer set, awaiting the remote answer
    Offering,
    /// Remote offer applied, local answer sent
    Answering,
    Connected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    LocalOffer,
    RemoteOffer,
    RemoteAnswer,
    /// Inbound media arrived or the transport reported connected
    MediaConnected,
    /// Discard the pending local offer
    Rollback,
    Close,
}

impl LinkState {
    /// Apply `event`, returning the next state
    ///
    /// A remote offer on an `Offering` link is a glare and is rejected here; the
    /// caller must `Rollback` first.
    pub fn transition(self, event: LinkEvent) -> Result<LinkState, NegotiationError> {
        use LinkEvent as E;
        use LinkState as S;

        let next = match (self, event) {
            (S::Closed, _) => None,
            (_, E::Close) => Some(S::Closed),

            (S::Idle, E::LocalOffer) => Some(S::Offering),
            (S::Idle, E::RemoteOffer) => Some(S::Answering),

            (S::Offering, E::RemoteAnswer) => Some(S::Connected),
            (S::Offering, E::Rollback) => Some(S::Idle),

            // renegotiation
            (S::Answering, E::RemoteOffer) => Some(S::Answering),
            (S::Connected, E::RemoteOffer) => Some(S::Answering),

            (S::Answering, E::MediaConnected) => Some(S::Connected),
            (S::Connected, E::MediaConnected) => Some(S::Connected),

            _ => None,
        };

        next.ok_or(NegotiationError::InvalidTransition { from: self, event })
    }

    pub fn is_closed(self) -> bool {
        self == LinkState::Closed
    }
}
