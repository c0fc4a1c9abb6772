//! Conversion logic between DTOs and domain types.

use tsudoi_shared::time::timestamp_to_rfc3339;

use crate::domain::{GroupProfile, Timestamp, UserId};
use crate::infrastructure::dto::{http as http_dto, websocket as ws_dto};

// ========================================
// DTO → Domain
// ========================================

impl From<&ws_dto::CreateConversationPayload> for GroupProfile {
    fn from(dto: &ws_dto::CreateConversationPayload) -> Self {
        Self {
            name: dto.name.clone(),
            description: dto.description.clone(),
            picture: dto.picture.clone(),
        }
    }
}

// ========================================
// Domain → DTO
// ========================================

impl http_dto::PresenceSnapshotDto {
    /// ユーザーごとの接続数から作成する
    pub fn from_counts(counts: Vec<(UserId, usize)>, generated_at: Timestamp) -> Self {
        let total_connections = counts.iter().map(|(_, count)| count).sum();
        Self {
            online_users: counts
                .into_iter()
                .map(|(user_id, connections)| http_dto::OnlineUserDto {
                    user_id: user_id.into_string(),
                    connections,
                })
                .collect(),
            total_connections,
            generated_at: timestamp_to_rfc3339(generated_at.value()),
        }
    }
}
