//! UseCase: グループ管理
//!
//! メンバー追加・削除・管理者追加は管理者のみ、退出は参加者なら誰でも行えます。
//! ダイレクト会話に対する操作は拒否します。
//!
//! 変更のたびに Membership Index を無効化し、
//! - ルーム（変更前からの参加者）に `conversation:updated`
//! - 追加されたユーザーの接続はルームに参加し `conversation:new`
//! - 削除・退出したユーザーの接続はルームから退出し `conversation:removed`
//!
//! を配信します。

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{
    ConnectionId, Conversation, ConversationId, ConversationRepository, MembershipIndex,
    PresenceRegistry, RoomRouter, ServerEvent, Timestamp, UserId,
};

use super::error::ConversationError;

pub struct ManageGroupUseCase {
    conversations: Arc<dyn ConversationRepository>,
    membership: Arc<MembershipIndex>,
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRouter>,
    clock: Arc<dyn Clock>,
}

impl ManageGroupUseCase {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        membership: Arc<MembershipIndex>,
        presence: Arc<PresenceRegistry>,
        rooms: Arc<RoomRouter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversations,
            membership,
            presence,
            rooms,
            clock,
        }
    }

    /// メンバーを追加する（既に参加しているユーザーは無視）
    pub async fn add_members(
        &self,
        conversation_id: &ConversationId,
        requester: &UserId,
        user_ids: Vec<UserId>,
    ) -> Result<Conversation, ConversationError> {
        self.authorize(conversation_id, requester, true).await?;

        let (conversation, added) = self
            .conversations
            .add_participants(conversation_id, user_ids, self.now())
            .await?;
        self.membership.invalidate(conversation_id).await;

        self.broadcast_updated(&conversation).await;
        let added_connections = self.presence.connections_of_all(added.iter()).await;
        self.rooms
            .join_all(&added_connections, conversation_id)
            .await;
        self.rooms
            .send_to(
                added_connections,
                &ServerEvent::ConversationNew {
                    conversation: conversation.clone(),
                },
            )
            .await;

        tracing::info!(
            "'{}' added {} member(s) to '{}'",
            requester,
            added.len(),
            conversation_id
        );
        Ok(conversation)
    }

    /// メンバーを削除する
    pub async fn remove_member(
        &self,
        conversation_id: &ConversationId,
        requester: &UserId,
        user_id: &UserId,
    ) -> Result<Conversation, ConversationError> {
        self.authorize(conversation_id, requester, true).await?;
        let conversation = self.remove(conversation_id, user_id).await?;
        tracing::info!(
            "'{}' removed '{}' from '{}'",
            requester,
            user_id,
            conversation_id
        );
        Ok(conversation)
    }

    /// グループから退出する
    pub async fn leave(
        &self,
        conversation_id: &ConversationId,
        requester: &UserId,
    ) -> Result<Conversation, ConversationError> {
        self.authorize(conversation_id, requester, false).await?;
        let conversation = self.remove(conversation_id, requester).await?;
        tracing::info!("'{}' left '{}'", requester, conversation_id);
        Ok(conversation)
    }

    /// 参加者を管理者にする
    pub async fn promote_admin(
        &self,
        conversation_id: &ConversationId,
        requester: &UserId,
        user_id: &UserId,
    ) -> Result<Conversation, ConversationError> {
        self.authorize(conversation_id, requester, true).await?;

        let conversation = self
            .conversations
            .add_admin(conversation_id, user_id, self.now())
            .await?;
        self.membership.invalidate(conversation_id).await;
        self.broadcast_updated(&conversation).await;

        tracing::info!(
            "'{}' promoted '{}' in '{}'",
            requester,
            user_id,
            conversation_id
        );
        Ok(conversation)
    }

    async fn authorize(
        &self,
        conversation_id: &ConversationId,
        requester: &UserId,
        require_admin: bool,
    ) -> Result<Conversation, ConversationError> {
        let conversation = self.conversations.get_conversation(conversation_id).await?;
        if !conversation.is_group() {
            return Err(ConversationError::NotGroup);
        }
        if !conversation.is_participant(requester) {
            return Err(ConversationError::NotParticipant);
        }
        if require_admin && !conversation.is_admin(requester) {
            return Err(ConversationError::NotAdmin);
        }
        Ok(conversation)
    }

    async fn remove(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<Conversation, ConversationError> {
        let conversation = self
            .conversations
            .remove_participant(conversation_id, user_id, self.now())
            .await?;
        self.membership.invalidate(conversation_id).await;

        let removed_connections: Vec<ConnectionId> = self
            .presence
            .connections_of(user_id)
            .await
            .into_iter()
            .collect();
        self.rooms
            .leave_all_of(&removed_connections, conversation_id)
            .await;
        self.rooms
            .send_to(
                removed_connections,
                &ServerEvent::ConversationRemoved {
                    conversation_id: conversation_id.clone(),
                },
            )
            .await;
        self.broadcast_updated(&conversation).await;
        Ok(conversation)
    }

    async fn broadcast_updated(&self, conversation: &Conversation) {
        let event = ServerEvent::ConversationUpdated {
            conversation: conversation.clone(),
        };
        self.rooms.broadcast(&conversation.id, &event, None).await;
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}
