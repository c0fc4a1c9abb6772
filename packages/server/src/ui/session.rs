//! Session lifecycle and inbound event dispatch.
//!
//! `Connecting → Authenticated → Active → Disconnected`
//!
//! - Connecting: WebSocket ハンドシェイク中
//! - Authenticated: トークンの検証に成功（アップグレード前）
//! - Active: 送信チャンネル・プレゼンス・ルームの登録が完了し、イベントを処理できる
//! - Disconnected: ソケットが閉じ、切断処理が完了
//!
//! Active なセッションのイベントは [`SessionContext`] がユースケースに振り分けます。
//! ユースケースのエラーはハンドラーの境界で止め、短い文言の `error` イベントとして
//! この接続にだけ返します（詳細はログに出力）。

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, ConversationId, GroupProfile, PusherChannel, ServerEvent, UserId},
    infrastructure::dto::websocket::ClientEvent,
    usecase::{
        ConversationError, CreateConversationCommand, DeliveryError, NotificationError,
        PresenceQueryError, SendMessageCommand,
    },
};

use super::state::AppState;

/// 解析できない受信フレームへの応答
pub const INVALID_EVENT_MESSAGE: &str = "Invalid event";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Authenticated,
    Active,
    Disconnected,
}

impl SessionPhase {
    /// 許可された遷移であれば遷移後の状態を返す
    pub fn advance(self, next: SessionPhase) -> Option<SessionPhase> {
        use SessionPhase::*;

        match (self, next) {
            (Connecting, Authenticated)
            | (Authenticated, Active)
            | (Connecting | Authenticated | Active, Disconnected) => Some(next),
            _ => None,
        }
    }
}

/// ハンドラー境界でのエラー（クライアント向けの文言とログ用の詳細）
struct HandlerError {
    message: &'static str,
    detail: String,
}

macro_rules! impl_handler_error {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for HandlerError {
                fn from(e: $error) -> Self {
                    Self {
                        message: e.user_message(),
                        detail: e.to_string(),
                    }
                }
            }
        )*
    };
}

impl_handler_error!(
    DeliveryError,
    ConversationError,
    NotificationError,
    PresenceQueryError,
);

/// Active なセッション 1 つ分のイベント処理
#[derive(Clone)]
pub struct SessionContext {
    state: Arc<AppState>,
    user_id: UserId,
    connection_id: ConnectionId,
    /// この接続への応答用チャンネル
    reply: PusherChannel,
}

impl SessionContext {
    pub fn new(
        state: Arc<AppState>,
        user_id: UserId,
        connection_id: ConnectionId,
        reply: PusherChannel,
    ) -> Self {
        Self {
            state,
            user_id,
            connection_id,
            reply,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// テキストフレーム 1 つを処理する
    pub async fn handle_text(&self, text: &str) {
        let event = match ClientEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    "Invalid event from '{}' ({}): {}",
                    self.user_id,
                    self.connection_id,
                    e
                );
                self.send(&ServerEvent::Error {
                    message: INVALID_EVENT_MESSAGE.to_string(),
                });
                return;
            }
        };

        let name = event.name();
        tracing::debug!("Received '{}' from '{}'", name, self.user_id);
        match self.dispatch(event).await {
            Ok(Some(reply)) => self.send(&reply),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("'{}' from '{}' declined: {}", name, self.user_id, e.detail);
                self.send(&ServerEvent::Error {
                    message: e.message.to_string(),
                });
            }
        }
    }

    /// イベントをユースケースに振り分け、この接続への応答があれば返す
    async fn dispatch(&self, event: ClientEvent) -> Result<Option<ServerEvent>, HandlerError> {
        let state = &self.state;
        let user_id = &self.user_id;

        match event {
            ClientEvent::MessageSend(payload) => {
                state
                    .send_message_usecase
                    .execute(SendMessageCommand {
                        conversation_id: payload.conversation_id,
                        sender_id: user_id.clone(),
                        content: payload.content,
                        message_type: payload.message_type,
                        reply_to_id: payload.reply_to_id,
                    })
                    .await?;
                Ok(None)
            }
            ClientEvent::TypingStart(payload) => {
                self.typing(&payload.conversation_id, true).await?;
                Ok(None)
            }
            ClientEvent::TypingStop(payload) => {
                self.typing(&payload.conversation_id, false).await?;
                Ok(None)
            }
            ClientEvent::MessagesRead(payload) => {
                state
                    .mark_read_usecase
                    .execute(&payload.conversation_id, user_id, &self.connection_id)
                    .await?;
                Ok(None)
            }
            ClientEvent::MessagesList(payload) => {
                let messages = state
                    .list_messages_usecase
                    .execute(&payload.conversation_id, user_id)
                    .await?;
                Ok(Some(ServerEvent::MessagesList {
                    conversation_id: payload.conversation_id,
                    messages,
                }))
            }
            ClientEvent::ConversationCreate(payload) => {
                state
                    .create_conversation_usecase
                    .execute(CreateConversationCommand {
                        requester: user_id.clone(),
                        kind: payload.kind,
                        profile: GroupProfile::from(&payload),
                        participant_ids: payload.participant_ids,
                    })
                    .await?;
                Ok(None)
            }
            ClientEvent::ConversationJoin(payload) => {
                state
                    .room_subscription_usecase
                    .join(&payload.conversation_id, user_id, &self.connection_id)
                    .await?;
                Ok(None)
            }
            ClientEvent::ConversationLeave(payload) => {
                state
                    .room_subscription_usecase
                    .leave(&payload.conversation_id, &self.connection_id)
                    .await;
                Ok(None)
            }
            ClientEvent::GroupMembersAdd(payload) => {
                state
                    .manage_group_usecase
                    .add_members(&payload.conversation_id, user_id, payload.user_ids)
                    .await?;
                Ok(None)
            }
            ClientEvent::GroupMembersRemove(payload) => {
                state
                    .manage_group_usecase
                    .remove_member(&payload.conversation_id, user_id, &payload.user_id)
                    .await?;
                Ok(None)
            }
            ClientEvent::GroupAdminsAdd(payload) => {
                state
                    .manage_group_usecase
                    .promote_admin(&payload.conversation_id, user_id, &payload.user_id)
                    .await?;
                Ok(None)
            }
            ClientEvent::GroupLeave(payload) => {
                state
                    .manage_group_usecase
                    .leave(&payload.conversation_id, user_id)
                    .await?;
                Ok(None)
            }
            ClientEvent::UsersOnlineRequest(_) => Ok(Some(ServerEvent::UsersOnlineList {
                user_ids: state.query_presence_usecase.online_users().await,
            })),
            ClientEvent::UserStatusRequest(payload) => {
                let status = state
                    .query_presence_usecase
                    .user_status(&payload.user_id)
                    .await?;
                Ok(Some(ServerEvent::UserStatusResponse {
                    user_id: status.user_id,
                    is_online: status.is_online,
                    last_seen: status.last_seen,
                }))
            }
            ClientEvent::NotificationsList(_) => {
                let notifications = state.manage_notifications_usecase.list(user_id).await?;
                Ok(Some(ServerEvent::NotificationsList { notifications }))
            }
            ClientEvent::NotificationRead(payload) => {
                let notification_ids = state
                    .manage_notifications_usecase
                    .mark_read(user_id, &payload.notification_id)
                    .await?;
                Ok(Some(ServerEvent::NotificationsRead { notification_ids }))
            }
            ClientEvent::NotificationsReadAll(_) => {
                let notification_ids = state
                    .manage_notifications_usecase
                    .mark_all_read(user_id)
                    .await?;
                Ok(Some(ServerEvent::NotificationsRead { notification_ids }))
            }
            ClientEvent::NotificationDelete(payload) => {
                state
                    .manage_notifications_usecase
                    .delete(user_id, &payload.notification_id)
                    .await?;
                Ok(Some(ServerEvent::NotificationDeleted {
                    notification_id: payload.notification_id,
                }))
            }
        }
    }

    async fn typing(
        &self,
        conversation_id: &ConversationId,
        is_typing: bool,
    ) -> Result<(), DeliveryError> {
        self.state
            .notify_typing_usecase
            .execute(conversation_id, &self.user_id, &self.connection_id, is_typing)
            .await
    }

    fn send(&self, event: &ServerEvent) {
        match event.to_json() {
            Ok(json) => {
                if self.reply.send(json).is_err() {
                    tracing::debug!(
                        "Connection '{}' closed before '{}' could be sent",
                        self.connection_id,
                        event.name()
                    );
                }
            }
            Err(e) => tracing::error!("Failed to serialize '{}': {}", event.name(), e),
        }
    }
}
