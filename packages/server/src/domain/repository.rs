//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 集合への追加・削除（`readBy`, 参加者, 管理者）はすべて Repository 内で
//! アトミックに行われます。UseCase 層で read-modify-write を行ってはいけません。

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    Conversation, ConversationId, Message, MessageId, Notification, NotificationId,
    RepositoryError, Timestamp, User, UserId,
};

/// User Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザーを取得
    async fn get_user(&self, user_id: &UserId) -> Result<User, RepositoryError>;

    /// ユーザーが存在しなければ作成し、表示名を最新の値に更新して返す
    async fn ensure_user(
        &self,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<User, RepositoryError>;

    /// オンライン状態と最終接続時刻を更新
    async fn set_presence(
        &self,
        user_id: &UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError>;
}

/// Conversation Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// 会話を取得
    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Conversation, RepositoryError>;

    /// ユーザーが参加している全ての会話を取得
    async fn list_conversations_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError>;

    /// 同じ 2 人のダイレクト会話があればそれを返し、なければ `candidate` を保存する
    ///
    /// 検索と作成は 1 回のアトミックな操作で行われる。
    /// 戻り値の `bool` は新規作成されたかどうか。
    async fn find_or_create_direct(
        &self,
        candidate: Conversation,
    ) -> Result<(Conversation, bool), RepositoryError>;

    /// グループ会話を保存
    async fn create_group(&self, conversation: Conversation)
    -> Result<Conversation, RepositoryError>;

    /// 参加者を追加（集合の和）し、更新後の会話と新規追加されたユーザーを返す
    async fn add_participants(
        &self,
        conversation_id: &ConversationId,
        user_ids: Vec<UserId>,
        now: Timestamp,
    ) -> Result<(Conversation, Vec<UserId>), RepositoryError>;

    /// 参加者を削除（管理者集合からも削除）
    async fn remove_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Conversation, RepositoryError>;

    /// 管理者を追加
    async fn add_admin(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Conversation, RepositoryError>;
}

/// Message Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを保存し、会話の最新メッセージと更新時刻を同時に進める
    async fn append_message(&self, message: Message) -> Result<Conversation, RepositoryError>;

    /// `user_id` 以外が送信し、まだ `user_id` が既読でないメッセージを一括で既読にする
    ///
    /// 既読にしたメッセージ ID を返す（該当なしは空のリスト）。
    async fn mark_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<Vec<MessageId>, RepositoryError>;

    /// 会話のメッセージを作成順に取得
    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError>;
}

/// Notification Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// 通知を保存
    async fn insert_notification(&self, notification: Notification)
    -> Result<(), RepositoryError>;

    /// ユーザーの通知を新しい順に取得
    async fn list_notifications(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, RepositoryError>;

    /// 通知を既読にする（所有者以外は NotFound）
    async fn mark_notification_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), RepositoryError>;

    /// ユーザーの未読通知を全て既読にし、変更した ID を返す
    async fn mark_all_notifications_read(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<NotificationId>, RepositoryError>;

    /// 通知を削除（所有者以外は NotFound）
    async fn delete_notification(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), RepositoryError>;
}

/// 各 Repository trait の実装をまとめたもの
///
/// 1 つのストア実装が全ての trait を実装している場合は [`Repositories::from_store`] で作成する。
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + ConversationRepository
            + MessageRepository
            + NotificationRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            conversations: store.clone(),
            messages: store.clone(),
            notifications: store,
        }
    }
}
