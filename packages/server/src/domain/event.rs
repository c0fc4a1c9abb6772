//! 接続中のクライアントへ送るイベント
//!
//! 形式: `{"event": "<name>", "data": { ...camelCase fields }}`.

use serde::Serialize;

use super::{
    Conversation, ConversationId, MessageId, MessageView, Notification, NotificationId, Timestamp,
    UserId,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    MessageNew { message: MessageView },

    #[serde(rename = "messages:list", rename_all = "camelCase")]
    MessagesList {
        conversation_id: ConversationId,
        messages: Vec<MessageView>,
    },

    #[serde(rename = "typing:update", rename_all = "camelCase")]
    TypingUpdate {
        conversation_id: ConversationId,
        user_id: UserId,
        is_typing: bool,
    },

    #[serde(rename = "messages:seen", rename_all = "camelCase")]
    MessagesSeen {
        conversation_id: ConversationId,
        user_id: UserId,
        message_ids: Vec<MessageId>,
    },

    #[serde(rename = "conversation:new")]
    ConversationNew { conversation: Conversation },

    #[serde(rename = "conversation:updated")]
    ConversationUpdated { conversation: Conversation },

    #[serde(rename = "conversation:removed", rename_all = "camelCase")]
    ConversationRemoved { conversation_id: ConversationId },

    #[serde(rename = "notification:new")]
    NotificationNew { notification: Notification },

    #[serde(rename = "notifications:list")]
    NotificationsList { notifications: Vec<Notification> },

    #[serde(rename = "notifications:read", rename_all = "camelCase")]
    NotificationsRead { notification_ids: Vec<NotificationId> },

    #[serde(rename = "notification:deleted", rename_all = "camelCase")]
    NotificationDeleted { notification_id: NotificationId },

    /// オンライン状態の遷移（全接続に配信）
    #[serde(rename = "user:status", rename_all = "camelCase")]
    UserStatus {
        user_id: UserId,
        is_online: bool,
        last_seen: Option<Timestamp>,
    },

    #[serde(rename = "users:online:list", rename_all = "camelCase")]
    UsersOnlineList { user_ids: Vec<UserId> },

    #[serde(rename = "user:status:response", rename_all = "camelCase")]
    UserStatusResponse {
        user_id: UserId,
        is_online: bool,
        last_seen: Option<Timestamp>,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageNew { .. } => "message:new",
            Self::MessagesList { .. } => "messages:list",
            Self::TypingUpdate { .. } => "typing:update",
            Self::MessagesSeen { .. } => "messages:seen",
            Self::ConversationNew { .. } => "conversation:new",
            Self::ConversationUpdated { .. } => "conversation:updated",
            Self::ConversationRemoved { .. } => "conversation:removed",
            Self::NotificationNew { .. } => "notification:new",
            Self::NotificationsList { .. } => "notifications:list",
            Self::NotificationsRead { .. } => "notifications:read",
            Self::NotificationDeleted { .. } => "notification:deleted",
            Self::UserStatus { .. } => "user:status",
            Self::UsersOnlineList { .. } => "users:online:list",
            Self::UserStatusResponse { .. } => "user:status:response",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
