//! UseCase: 通知のファンアウト
//!
//! 新しいメッセージ 1 件につき、送信者以外の参加者それぞれに通知を 1 件作成して保存し、
//! その参加者の全ての接続に `notification:new` を送信します。
//! 受信者ごとの失敗は他の受信者に影響しません（ログに記録するだけ）。

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{
    Conversation, Message, MessageType, Notification, NotificationId, NotificationRepository,
    PresenceRegistry, RoomRouter, ServerEvent, Timestamp, UserId, UserRepository,
};

/// 通知本文に含めるテキストの最大文字数
pub const BODY_PREVIEW_CHARS: usize = 50;

pub const MESSAGE_NOTIFICATION_TYPE: &str = "message";

const UNNAMED_GROUP_TITLE: &str = "Group";

/// 通知のタイトル: ダイレクト会話は送信者名、グループは会話名
pub fn notification_title(conversation: &Conversation, sender_name: &str) -> String {
    if conversation.is_group() {
        conversation
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_GROUP_TITLE.to_string())
    } else {
        sender_name.to_string()
    }
}

/// 通知の本文: メッセージ種別ごとの要約（グループでは送信者名を前置）
pub fn summarize_body(message: &Message, sender_name: &str, is_group: bool) -> String {
    let summary = match message.message_type {
        MessageType::Image => "📷 Photo".to_string(),
        MessageType::Video => "🎥 Video".to_string(),
        MessageType::File => "📎 File".to_string(),
        MessageType::Voice => "🎤 Voice message".to_string(),
        MessageType::System => "ℹ️ System message".to_string(),
        MessageType::Text | MessageType::Other(_) => truncate_preview(message.content.as_str()),
    };
    if is_group {
        format!("{}: {}", sender_name, summary)
    } else {
        summary
    }
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() > BODY_PREVIEW_CHARS {
        let head: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

pub struct NotificationFanOut {
    users: Arc<dyn UserRepository>,
    notifications: Arc<dyn NotificationRepository>,
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRouter>,
    clock: Arc<dyn Clock>,
}

impl NotificationFanOut {
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifications: Arc<dyn NotificationRepository>,
        presence: Arc<PresenceRegistry>,
        rooms: Arc<RoomRouter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            notifications,
            presence,
            rooms,
            clock,
        }
    }

    /// メッセージの通知を作成・配信し、保存できた通知の ID を返す
    pub async fn notify(
        &self,
        conversation: &Conversation,
        message: &Message,
    ) -> Vec<NotificationId> {
        let sender_name = match self.users.get_user(&message.sender_id).await {
            Ok(sender) => sender.display_name,
            Err(e) => {
                tracing::warn!(
                    "Sender '{}' not resolved for notification: {}",
                    message.sender_id,
                    e
                );
                message.sender_id.to_string()
            }
        };
        let title = notification_title(conversation, &sender_name);
        let body = summarize_body(message, &sender_name, conversation.is_group());
        let created_at = Timestamp::new(self.clock.now_millis());

        let mut created = Vec::new();
        for recipient in conversation
            .participants
            .iter()
            .filter(|participant| **participant != message.sender_id)
        {
            let notification = Notification {
                id: NotificationId::generate(),
                user_id: recipient.clone(),
                notification_type: MESSAGE_NOTIFICATION_TYPE.to_string(),
                title: title.clone(),
                body: body.clone(),
                payload: serde_json::json!({
                    "conversationId": conversation.id,
                    "messageId": message.id,
                    "senderId": message.sender_id,
                }),
                is_read: false,
                created_at,
            };
            if let Some(id) = self.deliver(recipient, notification).await {
                created.push(id);
            }
        }
        created
    }

    async fn deliver(&self, recipient: &UserId, notification: Notification) -> Option<NotificationId> {
        let id = notification.id.clone();
        if let Err(e) = self
            .notifications
            .insert_notification(notification.clone())
            .await
        {
            tracing::error!("Failed to store notification for '{}': {}", recipient, e);
            return None;
        }

        let connections: Vec<_> = self
            .presence
            .connections_of(recipient)
            .await
            .into_iter()
            .collect();
        self.rooms
            .send_to(connections, &ServerEvent::NotificationNew { notification })
            .await;
        Some(id)
    }
}
