//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    domain::Timestamp,
    infrastructure::dto::http::{HealthDto, PresenceSnapshotDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}

/// Debug endpoint: online users and their live connection counts
pub async fn debug_presence(State(state): State<Arc<AppState>>) -> Json<PresenceSnapshotDto> {
    let counts = state.query_presence_usecase.connection_counts().await;

    // Domain Model から DTO への変換
    Json(PresenceSnapshotDto::from_counts(
        counts,
        Timestamp::new(state.clock.now_millis()),
    ))
}
