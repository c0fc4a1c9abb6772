//! UseCase: メッセージ履歴の取得
//!
//! ステータスは保存せず、読み出し時点の readBy と現在の参加者数から毎回計算します。

use std::sync::Arc;

use crate::domain::{
    ConversationId, MembershipIndex, MessageRepository, MessageView, UserId,
};

use super::error::DeliveryError;

pub struct ListMessagesUseCase {
    messages: Arc<dyn MessageRepository>,
    membership: Arc<MembershipIndex>,
}

impl ListMessagesUseCase {
    pub fn new(messages: Arc<dyn MessageRepository>, membership: Arc<MembershipIndex>) -> Self {
        Self {
            messages,
            membership,
        }
    }

    /// 作成順のメッセージ一覧
    pub async fn execute(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<Vec<MessageView>, DeliveryError> {
        let participants = self.membership.participants_of(conversation_id).await?;
        if !participants.contains(user_id) {
            return Err(DeliveryError::NotParticipant);
        }

        let messages = self.messages.list_messages(conversation_id).await?;
        Ok(messages
            .into_iter()
            .map(|message| MessageView::new(message, participants.len()))
            .collect())
    }
}
