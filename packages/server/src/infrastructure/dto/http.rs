//! HTTP API レスポンスの DTO

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

/// `/debug/presence` のレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshotDto {
    pub online_users: Vec<OnlineUserDto>,
    pub total_connections: usize,
    /// RFC 3339 (UTC)
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUserDto {
    pub user_id: String,
    pub connections: usize,
}
