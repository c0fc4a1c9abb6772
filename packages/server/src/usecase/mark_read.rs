//! UseCase: 既読処理
//!
//! 会話内の「自分以外が送信し、まだ自分が既読でない」メッセージを一括で既読にし、
//! 1 件以上あればルーム（既読にした接続を除く）に `messages:seen` を配信します。
//! 2 回続けて呼んだ場合、2 回目は空のリストを返し何も配信しません。

use std::sync::Arc;

use crate::domain::{
    ConnectionId, ConversationId, MembershipIndex, MessageId, MessageRepository, RoomRouter,
    ServerEvent, UserId,
};

use super::error::DeliveryError;

pub struct MarkReadUseCase {
    messages: Arc<dyn MessageRepository>,
    membership: Arc<MembershipIndex>,
    rooms: Arc<RoomRouter>,
}

impl MarkReadUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        membership: Arc<MembershipIndex>,
        rooms: Arc<RoomRouter>,
    ) -> Self {
        Self {
            messages,
            membership,
            rooms,
        }
    }

    pub async fn execute(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        connection_id: &ConnectionId,
    ) -> Result<Vec<MessageId>, DeliveryError> {
        if !self
            .membership
            .is_participant(conversation_id, user_id)
            .await?
        {
            return Err(DeliveryError::NotParticipant);
        }

        let message_ids = self.messages.mark_read(conversation_id, user_id).await?;
        if message_ids.is_empty() {
            return Ok(message_ids);
        }

        tracing::debug!(
            "'{}' read {} message(s) in '{}'",
            user_id,
            message_ids.len(),
            conversation_id
        );
        let event = ServerEvent::MessagesSeen {
            conversation_id: conversation_id.clone(),
            user_id: user_id.clone(),
            message_ids: message_ids.clone(),
        };
        self.rooms
            .broadcast(conversation_id, &event, Some(connection_id))
            .await;
        Ok(message_ids)
    }
}
