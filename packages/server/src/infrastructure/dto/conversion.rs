//! Conversion logic between domain snapshots and HTTP DTOs.

use kupid_shared::time::timestamp_to_jst_rfc3339;

use crate::{
    domain::{MainStage, Member, RoundState},
    infrastructure::dto::http as dto,
    usecase::RoomSnapshot,
};

fn sessions(members: &[Member]) -> Vec<String> {
    members
        .iter()
        .map(|m| m.session.as_str().to_string())
        .collect()
}

// ========================================
// Domain → DTO
// ========================================

impl From<&RoomSnapshot> for dto::RoomSummaryDto {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            room_id: snapshot.room.id.as_str().to_string(),
            participants: sessions(&snapshot.room.participants),
            viewer_count: snapshot.room.viewer_count(),
            featured: snapshot.featured,
            created_at: timestamp_to_jst_rfc3339(snapshot.room.created_at),
        }
    }
}

impl From<&RoomSnapshot> for dto::RoomDetailDto {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            room_id: snapshot.room.id.as_str().to_string(),
            participants: sessions(&snapshot.room.participants),
            spectators: sessions(&snapshot.room.spectators),
            viewer_count: snapshot.room.viewer_count(),
            chat_count: snapshot.room.chat_history.len(),
            featured: snapshot.featured,
            round: snapshot.round.as_ref().and_then(round_dto),
            created_at: timestamp_to_jst_rfc3339(snapshot.room.created_at),
        }
    }
}

fn round_dto(state: &RoundState) -> Option<dto::RoundDto> {
    let round = state.current()?;
    Some(dto::RoundDto {
        index: state.current_index,
        total: state.total(),
        title: round.title.clone(),
        prompt: round.prompt.clone(),
        ends_at: timestamp_to_jst_rfc3339(state.ends_at),
    })
}

impl From<MainStage> for dto::MainStageDto {
    fn from(stage: MainStage) -> Self {
        Self {
            room_id: stage.room_id.map(|id| id.into_string()),
            ends_at: stage.ends_at.map(timestamp_to_jst_rfc3339),
        }
    }
}
