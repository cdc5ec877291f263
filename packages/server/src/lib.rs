//! Kupid server library.
//!
//! Pairs waiting users into two-person video rooms, relays WebRTC signaling
//! between them, features one room on the main stage and runs timed prompt
//! rounds. All coordination state lives in a single actor
//! ([`usecase::Coordinator`]); the Axum layer only forwards events to it.

// layers
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
