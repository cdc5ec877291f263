//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::RoomId,
    infrastructure::dto::http::{MainStageDto, RoomDetailDto, RoomSummaryDto},
    ui::state::AppState,
    usecase::CoordinatorError,
};

fn unavailable(e: CoordinatorError) -> StatusCode {
    tracing::error!("{}", e);
    StatusCode::SERVICE_UNAVAILABLE
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get active rooms (at least one participant)
pub async fn get_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomSummaryDto>>, StatusCode> {
    let rooms = state.coordinator.rooms().await.map_err(unavailable)?;
    Ok(Json(rooms.iter().map(RoomSummaryDto::from).collect()))
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let room_id = RoomId::try_from(room_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    match state.coordinator.room(room_id).await.map_err(unavailable)? {
        Some(snapshot) => Ok(Json(RoomDetailDto::from(&snapshot))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Get the currently featured room
pub async fn get_main_stage(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MainStageDto>, StatusCode> {
    let stage = state.coordinator.main_stage().await.map_err(unavailable)?;
    Ok(Json(MainStageDto::from(stage)))
}
