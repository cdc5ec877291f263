//! Client-side negotiation engine.
//!
//! One [`PeerLink`] per remote session in the current room, driven by
//! [`NegotiationManager`]. Links never share mutable state; the manager owns
//! the link map, the pending candidate buffer and the room-scoped timers.
//!
//! ```text
//! server events ─┐
//! media events  ─┼─▶ NegotiationManager ──▶ outbound ClientEvents
//! timers        ─┘        │
//!                         └─▶ PeerLink (state machine) ──▶ PeerConnection (engine)
//! ```

mod candidate_buffer;
mod error;
pub mod loopback;
mod manager;
pub mod media;
mod peer_link;
mod state;
mod timer;

pub use candidate_buffer::CandidateBuffer;
pub use error::NegotiationError;
pub use manager::{
    LocalRole, NegotiationConfig, NegotiationInbox, NegotiationInput, NegotiationManager,
};
pub use media::{MediaError, PeerConnection, PeerConnectionFactory};
pub use peer_link::PeerLink;
pub use state::{LinkEvent, LinkState};
pub use timer::{ClientTimerKey, TimerFired};
