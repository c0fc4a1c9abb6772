//! ConversationRepository のインメモリ実装

use async_trait::async_trait;

use super::InMemoryDirectory;
use crate::domain::{
    Conversation, ConversationId, ConversationKind, ConversationRepository, DomainError,
    RepositoryError, Timestamp, UserId,
};

fn not_found(conversation_id: &ConversationId) -> RepositoryError {
    RepositoryError::ConversationNotFound(conversation_id.to_string())
}

#[async_trait]
impl ConversationRepository for InMemoryDirectory {
    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Conversation, RepositoryError> {
        self.state
            .lock()
            .await
            .conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| not_found(conversation_id))
    }

    async fn list_conversations_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let state = self.state.lock().await;
        let mut conversations: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|conversation| conversation.is_participant(user_id))
            .cloned()
            .collect();
        // 最近更新された会話から
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn find_or_create_direct(
        &self,
        candidate: Conversation,
    ) -> Result<(Conversation, bool), RepositoryError> {
        let mut pair = candidate.participants.iter();
        let (Some(first), Some(second), None) = (pair.next(), pair.next(), pair.next()) else {
            return Err(DomainError::InvalidParticipants(
                "a direct conversation needs exactly two participants".to_string(),
            )
            .into());
        };
        if candidate.kind != ConversationKind::Direct {
            return Err(DomainError::InvalidParticipants(
                "only direct conversations are deduplicated".to_string(),
            )
            .into());
        }

        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .conversations
            .values()
            .find(|conversation| conversation.is_direct_between(first, second))
        {
            return Ok((existing.clone(), false));
        }

        state
            .conversations
            .insert(candidate.id.clone(), candidate.clone());
        Ok((candidate, true))
    }

    async fn create_group(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, RepositoryError> {
        self.state
            .lock()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn add_participants(
        &self,
        conversation_id: &ConversationId,
        user_ids: Vec<UserId>,
        now: Timestamp,
    ) -> Result<(Conversation, Vec<UserId>), RepositoryError> {
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| not_found(conversation_id))?;
        let added = conversation.add_participants(user_ids, now)?;
        Ok((conversation.clone(), added))
    }

    async fn remove_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| not_found(conversation_id))?;
        conversation.remove_participant(user_id, now)?;
        Ok(conversation.clone())
    }

    async fn add_admin(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| not_found(conversation_id))?;
        conversation.promote_admin(user_id, now)?;
        Ok(conversation.clone())
    }
}
