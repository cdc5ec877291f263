//! Shared library for the Kupid server and client.
//!
//! Holds what both sides of the wire agree on: the event vocabulary exchanged
//! over the WebSocket, clock helpers and logger setup.

pub mod logger;
pub mod protocol;
pub mod time;
