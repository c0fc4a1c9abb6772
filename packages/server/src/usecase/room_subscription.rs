//! UseCase: 接続単位のルーム購読（`conversation:join` / `conversation:leave`）
//!
//! 他の接続や保存済みの参加者には影響しません。

use std::sync::Arc;

use crate::domain::{ConnectionId, ConversationId, MembershipIndex, RoomRouter, UserId};

use super::error::ConversationError;

pub struct RoomSubscriptionUseCase {
    membership: Arc<MembershipIndex>,
    rooms: Arc<RoomRouter>,
}

impl RoomSubscriptionUseCase {
    pub fn new(membership: Arc<MembershipIndex>, rooms: Arc<RoomRouter>) -> Self {
        Self { membership, rooms }
    }

    /// 参加者であればこの接続をルームに参加させる
    pub async fn join(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        connection_id: &ConnectionId,
    ) -> Result<(), ConversationError> {
        if !self
            .membership
            .is_participant(conversation_id, user_id)
            .await?
        {
            return Err(ConversationError::NotParticipant);
        }
        self.rooms.join(connection_id, conversation_id).await;
        Ok(())
    }

    pub async fn leave(&self, conversation_id: &ConversationId, connection_id: &ConnectionId) {
        self.rooms.leave(connection_id, conversation_id).await;
    }
}
