//! UseCase: 入力中の通知
//!
//! `typing:update` をルームに配信します（入力中の接続自身には返しません）。
//! 何も保存しません。

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConversationId, MembershipIndex, RoomRouter, ServerEvent, UserId,
};

use super::error::DeliveryError;

pub struct NotifyTypingUseCase {
    membership: Arc<MembershipIndex>,
    rooms: Arc<RoomRouter>,
}

impl NotifyTypingUseCase {
    pub fn new(membership: Arc<MembershipIndex>, rooms: Arc<RoomRouter>) -> Self {
        Self { membership, rooms }
    }

    pub async fn execute(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        connection_id: &ConnectionId,
        is_typing: bool,
    ) -> Result<(), DeliveryError> {
        if !self
            .membership
            .is_participant(conversation_id, user_id)
            .await?
        {
            return Err(DeliveryError::NotParticipant);
        }

        let event = ServerEvent::TypingUpdate {
            conversation_id: conversation_id.clone(),
            user_id: user_id.clone(),
            is_typing,
        };
        self.rooms
            .broadcast(conversation_id, &event, Some(connection_id))
            .await;
        Ok(())
    }
}
