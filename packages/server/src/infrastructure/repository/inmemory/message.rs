//! MessageRepository のインメモリ実装

use async_trait::async_trait;

use super::InMemoryDirectory;
use crate::domain::{
    Conversation, ConversationId, Message, MessageId, MessageRepository, RepositoryError, UserId,
};

#[async_trait]
impl MessageRepository for InMemoryDirectory {
    async fn append_message(&self, message: Message) -> Result<Conversation, RepositoryError> {
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or_else(|| {
                RepositoryError::ConversationNotFound(message.conversation_id.to_string())
            })?;
        conversation.record_message(message.id.clone(), message.created_at);
        let conversation = conversation.clone();

        state
            .messages
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message);
        Ok(conversation)
    }

    async fn mark_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<Vec<MessageId>, RepositoryError> {
        let mut state = self.state.lock().await;
        if !state.conversations.contains_key(conversation_id) {
            return Err(RepositoryError::ConversationNotFound(
                conversation_id.to_string(),
            ));
        }

        let touched = state
            .messages
            .get_mut(conversation_id)
            .map(|messages| {
                messages
                    .iter_mut()
                    .filter_map(|message| {
                        message
                            .mark_read_by(user_id)
                            .then(|| message.id.clone())
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(touched)
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.lock().await;
        if !state.conversations.contains_key(conversation_id) {
            return Err(RepositoryError::ConversationNotFound(
                conversation_id.to_string(),
            ));
        }
        Ok(state
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{group, text_message, user};
    use super::*;
    use crate::domain::{ConversationRepository, Timestamp};

    #[tokio::test]
    async fn test_append_message_advances_last_message_pointer() {
        // テスト項目: メッセージ保存と同時に会話の最新メッセージと更新時刻が進む
        // given (前提条件):
        let directory = InMemoryDirectory::new();
        let conversation = directory
            .create_group(group("alice", &["bob"]))
            .await
            .unwrap();
        let message = text_message(&conversation.id, "alice", 5000);

        // when (操作):
        let updated = directory.append_message(message.clone()).await.unwrap();

        // then (期待する結果):
        assert_eq!(updated.last_message_id, Some(message.id.clone()));
        assert_eq!(updated.updated_at, Timestamp::new(5000));
        assert_eq!(
            directory.list_messages(&conversation.id).await.unwrap(),
            vec![message]
        );
    }

    #[tokio::test]
    async fn test_append_to_unknown_conversation_fails() {
        // テスト項目: 存在しない会話へのメッセージ保存は失敗し、何も保存されない
        // given (前提条件):
        let directory = InMemoryDirectory::new();
        let missing = ConversationId::new("missing".to_string()).unwrap();

        // when (操作):
        let result = directory
            .append_message(text_message(&missing, "alice", 1))
            .await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(RepositoryError::ConversationNotFound(_))
        ));
        assert!(directory.snapshot().await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        // テスト項目: 既読化は他人のメッセージのみ対象で、2 回目は空を返す
        // given (前提条件):
        let directory = InMemoryDirectory::new();
        let conversation = directory
            .create_group(group("alice", &["bob", "charlie"]))
            .await
            .unwrap();
        let from_alice = text_message(&conversation.id, "alice", 1);
        let from_bob = text_message(&conversation.id, "bob", 2);
        directory.append_message(from_alice.clone()).await.unwrap();
        directory.append_message(from_bob).await.unwrap();

        // when (操作):
        let first = directory
            .mark_read(&conversation.id, &user("bob"))
            .await
            .unwrap();
        let second = directory
            .mark_read(&conversation.id, &user("bob"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(first, vec![from_alice.id]);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_without_messages_returns_empty() {
        // テスト項目: メッセージのない会話の既読化はエラーではなく空を返す
        // given (前提条件):
        let directory = InMemoryDirectory::new();
        let conversation = directory
            .create_group(group("alice", &["bob"]))
            .await
            .unwrap();

        // when (操作):
        let touched = directory
            .mark_read(&conversation.id, &user("bob"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(touched.is_empty());
    }
}
