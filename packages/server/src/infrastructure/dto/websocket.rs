//! WebSocket 受信イベントの DTO
//!
//! 受信フレームの形式: `{"event": "<name>", "data": { ...camelCase }}`。
//! `data` を持たないイベントは `data` を省略（または `null`）できます。
//! 識別子やメッセージ本文はここで値オブジェクトとして検証されます。

use serde::Deserialize;

use crate::domain::{
    ConversationId, ConversationKind, MessageContent, MessageId, MessageType, NotificationId,
    UserId,
};

/// クライアントから受信するイベント
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "message:send")]
    MessageSend(SendMessagePayload),

    #[serde(rename = "typing:start")]
    TypingStart(ConversationRef),

    #[serde(rename = "typing:stop")]
    TypingStop(ConversationRef),

    #[serde(rename = "messages:read")]
    MessagesRead(ConversationRef),

    #[serde(rename = "messages:list")]
    MessagesList(ConversationRef),

    #[serde(rename = "conversation:create")]
    ConversationCreate(CreateConversationPayload),

    #[serde(rename = "conversation:join")]
    ConversationJoin(ConversationRef),

    #[serde(rename = "conversation:leave")]
    ConversationLeave(ConversationRef),

    #[serde(rename = "group:members:add")]
    GroupMembersAdd(AddMembersPayload),

    #[serde(rename = "group:members:remove")]
    GroupMembersRemove(GroupUserPayload),

    #[serde(rename = "group:admins:add")]
    GroupAdminsAdd(GroupUserPayload),

    #[serde(rename = "group:leave")]
    GroupLeave(ConversationRef),

    #[serde(rename = "users:online:request")]
    UsersOnlineRequest(EmptyPayload),

    #[serde(rename = "user:status:request")]
    UserStatusRequest(UserRef),

    #[serde(rename = "notifications:list")]
    NotificationsList(EmptyPayload),

    #[serde(rename = "notification:read")]
    NotificationRead(NotificationRef),

    #[serde(rename = "notifications:read-all")]
    NotificationsReadAll(EmptyPayload),

    #[serde(rename = "notification:delete")]
    NotificationDelete(NotificationRef),
}

impl ClientEvent {
    /// テキストフレームを解析する
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;
        if let Some(envelope) = value.as_object_mut() {
            let data = envelope
                .entry("data")
                .or_insert(serde_json::Value::Null);
            if data.is_null() {
                *data = serde_json::Value::Object(serde_json::Map::new());
            }
        }
        serde_json::from_value(value)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageSend(_) => "message:send",
            Self::TypingStart(_) => "typing:start",
            Self::TypingStop(_) => "typing:stop",
            Self::MessagesRead(_) => "messages:read",
            Self::MessagesList(_) => "messages:list",
            Self::ConversationCreate(_) => "conversation:create",
            Self::ConversationJoin(_) => "conversation:join",
            Self::ConversationLeave(_) => "conversation:leave",
            Self::GroupMembersAdd(_) => "group:members:add",
            Self::GroupMembersRemove(_) => "group:members:remove",
            Self::GroupAdminsAdd(_) => "group:admins:add",
            Self::GroupLeave(_) => "group:leave",
            Self::UsersOnlineRequest(_) => "users:online:request",
            Self::UserStatusRequest(_) => "user:status:request",
            Self::NotificationsList(_) => "notifications:list",
            Self::NotificationRead(_) => "notification:read",
            Self::NotificationsReadAll(_) => "notifications:read-all",
            Self::NotificationDelete(_) => "notification:delete",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmptyPayload {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRef {
    pub notification_id: NotificationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub conversation_id: ConversationId,
    pub content: MessageContent,
    #[serde(default, rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub reply_to_id: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationPayload {
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    pub participant_ids: Vec<UserId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersPayload {
    pub conversation_id: ConversationId,
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUserPayload {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_send_with_defaults() {
        // テスト項目: type と replyToId を省略した message:send はテキストとして解析される
        // given (前提条件):
        let frame = r#"{"event":"message:send","data":{"conversationId":"c1","content":"hi"}}"#;

        // when (操作):
        let event = ClientEvent::parse(frame).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            ClientEvent::MessageSend(SendMessagePayload {
                conversation_id: ConversationId::new("c1".to_string()).unwrap(),
                content: MessageContent::new("hi".to_string()).unwrap(),
                message_type: MessageType::Text,
                reply_to_id: None,
            })
        );
    }

    #[test]
    fn test_unknown_message_type_is_kept() {
        // テスト項目: 未知のメッセージ種別でもフレームは拒否されず、その文字列のまま保持・出力される
        // given (前提条件):
        let frame = r#"{"event":"message:send","data":{"conversationId":"c1","content":"hi","type":"sticker"}}"#;

        // when (操作):
        let event = ClientEvent::parse(frame).unwrap();

        // then (期待する結果):
        let ClientEvent::MessageSend(payload) = event else {
            panic!("unexpected event");
        };
        assert_eq!(payload.message_type, MessageType::Other("sticker".to_string()));
        assert_eq!(
            serde_json::to_value(&payload.message_type).unwrap(),
            serde_json::json!("sticker")
        );
        assert_eq!(
            serde_json::to_value(MessageType::Image).unwrap(),
            serde_json::json!("image")
        );
    }

    #[test]
    fn test_parse_event_without_data() {
        // テスト項目: data を持たないイベントは data の省略・null どちらでも解析できる
        // given (前提条件):
        let without = r#"{"event":"users:online:request"}"#;
        let with_null = r#"{"event":"notifications:read-all","data":null}"#;

        // when (操作):
        let first = ClientEvent::parse(without).unwrap();
        let second = ClientEvent::parse(with_null).unwrap();

        // then (期待する結果):
        assert_eq!(first.name(), "users:online:request");
        assert_eq!(second.name(), "notifications:read-all");
    }

    #[test]
    fn test_parse_conversation_create() {
        // テスト項目: conversation:create の type と参加者が解析される
        // given (前提条件):
        let frame = r#"{"event":"conversation:create","data":{"type":"group","participantIds":["bob","charlie"],"name":"Team"}}"#;

        // when (操作):
        let event = ClientEvent::parse(frame).unwrap();

        // then (期待する結果):
        let ClientEvent::ConversationCreate(payload) = event else {
            panic!("unexpected event");
        };
        assert_eq!(payload.kind, ConversationKind::Group);
        assert_eq!(payload.participant_ids.len(), 2);
        assert_eq!(payload.name.as_deref(), Some("Team"));
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        // テスト項目: 不正なフレームは解析エラーになる
        // given (前提条件):
        let frames = [
            "not json",
            r#"{"event":"unknown:event","data":{}}"#,
            r#"{"event":"message:send","data":{"conversationId":"c1"}}"#,
            r#"{"event":"message:send","data":{"conversationId":"","content":"hi"}}"#,
            r#"{"event":"message:send","data":{"conversationId":"c1","content":"   "}}"#,
            r#"["message:send"]"#,
        ];

        // when (操作) / then (期待する結果):
        for frame in frames {
            assert!(ClientEvent::parse(frame).is_err(), "accepted: {}", frame);
        }
    }
}
