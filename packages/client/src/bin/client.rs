//! Headless Kupid client with reconnection support.
//!
//! Registers a session, optionally subscribes to the lobby, then joins a room
//! or waits in the matchmaking queue. Negotiation runs against the loopback
//! media engine. Automatically reconnects on disconnection (max 5 attempts
//! with 5 second interval) keeping the same session id.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kupid-client -- --room abc
//! cargo run --bin kupid-client -- --queue --lobby
//! ```

use std::time::Duration;

use clap::Parser;

use kupid_client::{SessionOptions, negotiation::NegotiationConfig, run_client};
use kupid_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kupid-client")]
#[command(about = "Headless client for the Kupid matchmaking server", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, env = "KUPID_URL", default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// Session id (defaults to a fresh UUID v4)
    #[arg(short = 's', long)]
    session: Option<String>,

    /// Room to join on startup
    #[arg(short = 'r', long)]
    room: Option<String>,

    /// Enter the matchmaking queue when not in a room
    #[arg(short = 'q', long)]
    queue: bool,

    /// Subscribe to lobby updates (active rooms, main stage)
    #[arg(short = 'l', long)]
    lobby: bool,

    /// Delay of the single retry toward a peer, in milliseconds
    #[arg(long, default_value_t = 5000)]
    retry_delay_ms: u64,

    /// Delay of the participant-count check after joining, in milliseconds
    #[arg(long, default_value_t = 3000)]
    participant_check_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_CRATE_NAME"), "info");

    let args = Args::parse();

    let options = SessionOptions {
        url: args.url,
        session: args
            .session
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        room: args.room,
        lobby: args.lobby,
        queue: args.queue,
        negotiation: NegotiationConfig {
            retry_delay: Duration::from_millis(args.retry_delay_ms),
            participant_check_delay: Duration::from_millis(args.participant_check_ms),
        },
    };

    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
