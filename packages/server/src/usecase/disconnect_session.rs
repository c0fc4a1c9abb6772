//! UseCase: セッション切断処理
//!
//! `Active → Disconnected` の遷移。全てのルームから退出し、送信チャンネルを解除し、
//! Presence Registry から削除します。最後の接続だった場合のみ、オフライン状態と
//! 最終接続時刻を保存して `user:status` を全体に配信します。

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{
    ConnectionId, MessagePusher, PresenceRegistry, RoomRouter, ServerEvent, Timestamp, UserId,
    UserRepository,
};

pub struct DisconnectSessionUseCase {
    users: Arc<dyn UserRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRouter>,
    clock: Arc<dyn Clock>,
}

impl DisconnectSessionUseCase {
    pub fn new(
        users: Arc<dyn UserRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        presence: Arc<PresenceRegistry>,
        rooms: Arc<RoomRouter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            message_pusher,
            presence,
            rooms,
            clock,
        }
    }

    /// 切断処理を実行し、オフラインに遷移したかどうかを返す
    pub async fn execute(&self, user_id: &UserId, connection_id: &ConnectionId) -> bool {
        let left = self.rooms.leave_all(connection_id).await;
        self.message_pusher
            .unregister_connection(connection_id)
            .await;
        let went_offline = self.presence.unregister(user_id, connection_id).await;

        tracing::info!(
            "Connection '{}' of '{}' closed (left {} room(s), last connection: {})",
            connection_id,
            user_id,
            left.len(),
            went_offline
        );

        if went_offline {
            let now = Timestamp::new(self.clock.now_millis());
            if let Err(e) = self.users.set_presence(user_id, false, now).await {
                tracing::warn!("Failed to persist offline status of '{}': {}", user_id, e);
            }
            let event = ServerEvent::UserStatus {
                user_id: user_id.clone(),
                is_online: false,
                last_seen: Some(now),
            };
            self.rooms
                .send_to(self.presence.all_connections().await, &event)
                .await;
        }

        went_offline
    }
}
