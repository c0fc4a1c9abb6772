//! UseCase: セッション接続処理
//!
//! `Connecting → Authenticated → Active` の遷移を担当します。
//!
//! 1. 認証（トークン → ユーザー ID）
//! 2. 接続の送信チャンネルを MessagePusher に登録
//! 3. ユーザーの作成・表示名の更新
//! 4. Presence Registry に登録
//! 5. 参加中の会話を読み込み、最初の接続であれば `user:status` を全体に配信
//! 6. 会話ごとのルームに参加

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConversationId, ConversationRepository, IdentityVerifier, MessagePusher,
    PresenceRegistry, PusherChannel, RoomRouter, ServerEvent, Timestamp, User, UserRepository,
    VerifiedIdentity,
};

use super::error::ConnectError;

/// 接続に成功したセッションの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub user: User,
    pub connection_id: ConnectionId,
    /// 参加したルーム
    pub rooms: Vec<ConversationId>,
    /// このユーザーの最初の接続だったか
    pub came_online: bool,
}

pub struct ConnectSessionUseCase {
    verifier: Arc<dyn IdentityVerifier>,
    users: Arc<dyn UserRepository>,
    conversations: Arc<dyn ConversationRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRouter>,
    clock: Arc<dyn Clock>,
}

impl ConnectSessionUseCase {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        users: Arc<dyn UserRepository>,
        conversations: Arc<dyn ConversationRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        presence: Arc<PresenceRegistry>,
        rooms: Arc<RoomRouter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            verifier,
            users,
            conversations,
            message_pusher,
            presence,
            rooms,
            clock,
        }
    }

    /// ハンドシェイク時のトークンを検証する
    pub async fn authenticate(
        &self,
        token: Option<&str>,
    ) -> Result<VerifiedIdentity, ConnectError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ConnectError::Unauthenticated)?;
        Ok(self.verifier.verify(token).await?)
    }

    /// 認証済みの接続をアクティブにする
    ///
    /// 会話の読み込みより先に Presence Registry へ登録する。読み込み中に作成された会話は
    /// `conversation:create` 側がこの接続を見つけてルームに参加させる（`join` は冪等）。
    /// 途中で失敗した場合は登録済みの送信チャンネルと Presence を解除してから返す。
    pub async fn execute(
        &self,
        identity: &VerifiedIdentity,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<ActiveSession, ConnectError> {
        self.message_pusher
            .register_connection(connection_id.clone(), sender)
            .await;

        let user = match self.ensure_user(identity).await {
            Ok(user) => user,
            Err(e) => {
                self.message_pusher
                    .unregister_connection(&connection_id)
                    .await;
                return Err(e);
            }
        };

        let came_online = self.presence.register(&user.id, &connection_id).await;

        let conversations = match self.conversations.list_conversations_for(&user.id).await {
            Ok(conversations) => conversations,
            Err(e) => {
                self.rollback(&user, &connection_id, came_online).await;
                return Err(ConnectError::Repository(e.to_string()));
            }
        };

        if came_online {
            self.announce_online(&user, &connection_id).await;
        }

        let rooms: Vec<ConversationId> = conversations.into_iter().map(|c| c.id).collect();
        for room_id in &rooms {
            self.rooms.join(&connection_id, room_id).await;
        }

        tracing::info!(
            "User '{}' connected as '{}' ({} room(s), first connection: {})",
            user.id,
            connection_id,
            rooms.len(),
            came_online
        );

        Ok(ActiveSession {
            user,
            connection_id,
            rooms,
            came_online,
        })
    }

    async fn ensure_user(&self, identity: &VerifiedIdentity) -> Result<User, ConnectError> {
        self.users
            .ensure_user(&identity.user_id, &identity.display_name)
            .await
            .map_err(|e| ConnectError::Repository(e.to_string()))
    }

    /// 失敗した接続の登録を取り消す
    ///
    /// この接続が最初の接続で、その間に同じユーザーの別の接続が登録されていた場合は、
    /// オンライン配信をそちらに引き継ぐ。
    async fn rollback(&self, user: &User, connection_id: &ConnectionId, came_online: bool) {
        let went_offline = self.presence.unregister(&user.id, connection_id).await;
        self.rooms.leave_all(connection_id).await;
        self.message_pusher
            .unregister_connection(connection_id)
            .await;
        if came_online && !went_offline {
            self.announce_online(user, connection_id).await;
        }
    }

    /// オンラインへの遷移を保存し、新しい接続以外の全接続に配信する
    async fn announce_online(&self, user: &User, connection_id: &ConnectionId) {
        let now = Timestamp::new(self.clock.now_millis());
        if let Err(e) = self.users.set_presence(&user.id, true, now).await {
            tracing::warn!("Failed to persist online status of '{}': {}", user.id, e);
        }

        let targets: Vec<ConnectionId> = self
            .presence
            .all_connections()
            .await
            .into_iter()
            .filter(|target| target != connection_id)
            .collect();
        let event = ServerEvent::UserStatus {
            user_id: user.id.clone(),
            is_online: true,
            last_seen: Some(now),
        };
        self.rooms.send_to(targets, &event).await;
    }
}
