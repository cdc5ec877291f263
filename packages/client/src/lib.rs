//! Kupid headless client.
//!
//! Holds one session id for its lifetime, drives per-peer negotiation through
//! [`negotiation::NegotiationManager`] and reconnects the transport on loss.

pub mod domain;
pub mod error;
pub mod formatter;
pub mod negotiation;
pub mod runner;
pub mod session;
pub mod ui;

pub use runner::run_client;
pub use session::SessionOptions;
