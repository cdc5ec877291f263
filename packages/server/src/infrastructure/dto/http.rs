//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// `GET /api/rooms` の要素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub room_id: String,
    pub participants: Vec<String>,
    pub viewer_count: usize,
    pub featured: bool,
    pub created_at: String,
}

/// `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub room_id: String,
    pub participants: Vec<String>,
    pub spectators: Vec<String>,
    pub viewer_count: usize,
    pub chat_count: usize,
    pub featured: bool,
    pub round: Option<RoundDto>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundDto {
    /// 0-based
    pub index: usize,
    pub total: usize,
    pub title: String,
    pub prompt: String,
    pub ends_at: String,
}

/// `GET /api/main-stage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainStageDto {
    pub room_id: Option<String>,
    pub ends_at: Option<String>,
}
