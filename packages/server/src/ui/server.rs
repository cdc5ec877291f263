//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::usecase::CoordinatorHandle;

use super::{
    handler::{get_main_stage, get_room_detail, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Build the application router
///
/// 統合テストからも同じルーティングを使えるように公開している。
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .route("/api/rooms", get(get_rooms))
        .route("/api/rooms/{room_id}", get(get_room_detail))
        .route("/api/main-stage", get(get_main_stage))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Kupid signaling server
///
/// # Example
///
/// ```ignore
/// let (coordinator, _task) = Coordinator::spawn(config, pusher, clock);
/// let server = Server::new(coordinator);
/// server.run("127.0.0.1".to_string(), 3000).await?;
/// ```
pub struct Server {
    coordinator: CoordinatorHandle,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `coordinator` - Handle to the running coordinator actor
    pub fn new(coordinator: CoordinatorHandle) -> Self {
        Self { coordinator }
    }

    /// Run the server until Ctrl+C / SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 3000)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Kupid server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// 終了時には Coordinator も停止させ、全てのタイマーを取り消す。
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let coordinator = self.coordinator.clone();
        let app = router(Arc::new(AppState {
            coordinator: self.coordinator,
        }));

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        if coordinator.shutdown().is_err() {
            tracing::debug!("Coordinator already stopped");
        }
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
