//! Kupid matchmaking and signaling server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kupid-server
//! cargo run --bin kupid-server -- --host 0.0.0.0 --port 3000 --main-stage-secs 60
//! ```

use std::sync::Arc;

use clap::Parser;
use kupid_server::{
    config::ServerConfig, infrastructure::message_pusher::WebSocketMessagePusher, ui::Server,
    usecase::Coordinator,
};
use kupid_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_CRATE_NAME"), "info");

    let config = ServerConfig::parse();
    tracing::debug!(?config, "Loaded configuration");

    // 1. MessagePusher (WebSocket implementation)
    let pusher = Arc::new(WebSocketMessagePusher::default());

    // 2. Coordinator (single actor owning every registry)
    let (coordinator, coordinator_task) =
        Coordinator::spawn(config.coordinator_config(), pusher, Arc::new(SystemClock));

    // 3. Server
    let server = Server::new(coordinator);
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = coordinator_task.await {
        tracing::error!("Coordinator task failed: {}", e);
    }
}
