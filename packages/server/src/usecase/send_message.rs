//! UseCase: メッセージ送信処理
//!
//! 1. 送信者が会話の参加者であることを確認（Membership Index）
//! 2. `readBy = {送信者}` でメッセージを保存し、会話の最新メッセージを同時に進める
//! 3. 現在の参加者数でステータスを計算
//! 4. ルーム全体（送信者の接続を含む）に `message:new` を配信
//! 5. 通知のファンアウト
//!
//! 保存に失敗した場合は何も配信しません。

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{
    ConversationId, MembershipIndex, Message, MessageContent, MessageId, MessageRepository,
    MessageType, MessageView, RoomRouter, ServerEvent, Timestamp, UserId,
};

use super::{error::DeliveryError, notification_fan_out::NotificationFanOut};

/// 送信リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub message_type: MessageType,
    /// 存在確認は行わない（削除済みメッセージへの返信もそのまま保存する）
    pub reply_to_id: Option<MessageId>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    messages: Arc<dyn MessageRepository>,
    membership: Arc<MembershipIndex>,
    rooms: Arc<RoomRouter>,
    fan_out: Arc<NotificationFanOut>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        membership: Arc<MembershipIndex>,
        rooms: Arc<RoomRouter>,
        fan_out: Arc<NotificationFanOut>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            membership,
            rooms,
            fan_out,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(MessageView)` - 保存されたメッセージと送信時点のステータス
    /// * `Err(DeliveryError)` - 参加者でない、会話が存在しない、保存に失敗した
    pub async fn execute(&self, command: SendMessageCommand) -> Result<MessageView, DeliveryError> {
        if !self
            .membership
            .is_participant(&command.conversation_id, &command.sender_id)
            .await?
        {
            return Err(DeliveryError::NotParticipant);
        }

        let message = Message::new(
            MessageId::generate(),
            command.conversation_id,
            command.sender_id,
            command.content,
            command.message_type,
            command.reply_to_id,
            Timestamp::new(self.clock.now_millis()),
        );

        let conversation = self
            .messages
            .append_message(message.clone())
            .await
            .inspect_err(|e| tracing::error!("Failed to persist message '{}': {}", message.id, e))?;

        let view = MessageView::new(message.clone(), conversation.participant_count());
        tracing::info!(
            "Message '{}' sent by '{}' to '{}' ({:?})",
            message.id,
            message.sender_id,
            conversation.id,
            view.status
        );

        self.rooms
            .broadcast(
                &conversation.id,
                &ServerEvent::MessageNew {
                    message: view.clone(),
                },
                None,
            )
            .await;
        self.fan_out.notify(&conversation, &message).await;

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeliveryStatus, MockMessageRepository, Repositories, RepositoryError};
    use crate::usecase::test_support::{Fixture, NOW, user};

    fn usecase(fixture: &Fixture) -> SendMessageUseCase {
        let fan_out = Arc::new(NotificationFanOut::new(
            fixture.repositories.users.clone(),
            fixture.repositories.notifications.clone(),
            fixture.presence.clone(),
            fixture.rooms.clone(),
            fixture.clock.clone(),
        ));
        SendMessageUseCase::new(
            fixture.repositories.messages.clone(),
            fixture.membership.clone(),
            fixture.rooms.clone(),
            fan_out,
            fixture.clock.clone(),
        )
    }

    fn command(conversation_id: &ConversationId, sender: &str, text: &str) -> SendMessageCommand {
        SendMessageCommand {
            conversation_id: conversation_id.clone(),
            sender_id: user(sender),
            content: MessageContent::new(text.to_string()).unwrap(),
            message_type: MessageType::Text,
            reply_to_id: None,
        }
    }

    #[tokio::test]
    async fn test_send_message_reaches_whole_room_and_notifies_recipient() {
        // テスト項目: 送信者の全接続を含むルーム全体に message:new が届き、受信者に通知が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let conversation_id = fixture.seed_direct("alice", "bob").await;
        let mut alice_phone = fixture.connect("alice").await;
        let mut alice_laptop = fixture.connect("alice").await;
        let mut bob = fixture.connect("bob").await;

        // when (操作):
        let view = usecase(&fixture)
            .execute(command(&conversation_id, "alice", "hi"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(view.status, DeliveryStatus::Sent);
        assert_eq!(view.message.created_at, Timestamp::new(NOW));
        assert_eq!(alice_phone.drain_names(), vec!["message:new"]);
        assert_eq!(alice_laptop.drain_names(), vec!["message:new"]);
        let events = bob.drain();
        assert_eq!(events[0]["event"], "message:new");
        assert_eq!(events[0]["data"]["message"]["content"], "hi");
        assert_eq!(events[0]["data"]["message"]["status"], "sent");
        assert_eq!(events[0]["data"]["message"]["readBy"], serde_json::json!(["alice"]));
        assert_eq!(events[1]["event"], "notification:new");
        assert_eq!(events[1]["data"]["notification"]["title"], "Alice");
        assert_eq!(events[1]["data"]["notification"]["body"], "hi");
    }

    #[tokio::test]
    async fn test_reply_to_unknown_message_is_stored_as_is() {
        // テスト項目: 存在しないメッセージへの返信も検証せずに保存される
        // given (前提条件):
        let fixture = Fixture::new();
        let conversation_id = fixture.seed_direct("alice", "bob").await;
        let reply_to = MessageId::new("deleted-message".to_string()).unwrap();
        let mut request = command(&conversation_id, "alice", "replying");
        request.reply_to_id = Some(reply_to.clone());

        // when (操作):
        let view = usecase(&fixture).execute(request).await.unwrap();

        // then (期待する結果):
        assert_eq!(view.message.reply_to_id, Some(reply_to));
    }

    #[tokio::test]
    async fn test_non_participant_is_declined() {
        // テスト項目: 参加者でないユーザーの送信は拒否され、何も保存されない
        // given (前提条件):
        let fixture = Fixture::new();
        let conversation_id = fixture.seed_direct("alice", "bob").await;
        let mut bob = fixture.connect("bob").await;

        // when (操作):
        let result = usecase(&fixture)
            .execute(command(&conversation_id, "mallory", "intrusion"))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(DeliveryError::NotParticipant));
        assert!(bob.drain().is_empty());
        assert!(
            fixture
                .directory
                .list_messages(&conversation_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        // テスト項目: 存在しない会話への送信は ConversationNotFound
        // given (前提条件):
        let fixture = Fixture::new();
        let missing = ConversationId::new("missing".to_string()).unwrap();

        // when (操作):
        let result = usecase(&fixture)
            .execute(command(&missing, "alice", "hello?"))
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(DeliveryError::ConversationNotFound));
    }

    #[tokio::test]
    async fn test_persistence_failure_broadcasts_nothing() {
        // テスト項目: 保存に失敗した場合はエラーを返し、何も配信しない
        // given (前提条件):
        let mut messages = MockMessageRepository::new();
        messages
            .expect_append_message()
            .times(1)
            .returning(|_| Err(RepositoryError::Storage("disk full".to_string())));
        let fixture = Fixture::with_overrides(|repositories| Repositories {
            messages: Arc::new(messages),
            ..repositories
        });
        let conversation_id = fixture.seed_direct("alice", "bob").await;
        let mut alice = fixture.connect("alice").await;
        let mut bob = fixture.connect("bob").await;

        // when (操作):
        let result = usecase(&fixture)
            .execute(command(&conversation_id, "alice", "lost"))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(DeliveryError::Persistence(_))));
        assert!(alice.drain().is_empty());
        assert!(bob.drain().is_empty());
    }
}
