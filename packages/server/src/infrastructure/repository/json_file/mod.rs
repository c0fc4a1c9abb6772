//! JSON スナップショットファイルを使った Directory Store 実装
//!
//! 読み込みはインメモリの状態から行い、変更操作のたびに全体を
//! 一時ファイルへ書き出してから rename で置き換えます（アトミックな書き込み）。
//! 書き込みに失敗した場合はインメモリの状態を変更前に戻し、
//! `RepositoryError::Storage` として呼び出し元に返します。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{
    fs,
    sync::{Mutex, MutexGuard},
};

use super::inmemory::{DirectorySnapshot, InMemoryDirectory};
use crate::domain::{
    Conversation, ConversationId, ConversationRepository, Message, MessageId, MessageRepository,
    Notification, NotificationId, NotificationRepository, RepositoryError, Timestamp, User,
    UserId, UserRepository,
};

pub struct JsonFileDirectory {
    path: PathBuf,
    inner: InMemoryDirectory,
    /// 変更操作と書き出しを直列化する
    write_lock: Mutex<()>,
}

/// 実行中の変更操作（変更前の状態を保持する）
struct PendingWrite<'a> {
    _guard: MutexGuard<'a, ()>,
    before: DirectorySnapshot,
}

impl JsonFileDirectory {
    /// スナップショットファイルを開く（存在しなければ空の状態から始める）
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if fs::try_exists(&path).await.map_err(storage_error)? {
            let content = fs::read_to_string(&path).await.map_err(storage_error)?;
            serde_json::from_str::<DirectorySnapshot>(&content).map_err(|e| {
                RepositoryError::Storage(format!("failed to parse {}: {}", path.display(), e))
            })?
        } else {
            DirectorySnapshot::default()
        };

        tracing::info!(
            "Loaded directory snapshot from {} ({} users, {} conversations)",
            path.display(),
            snapshot.users.len(),
            snapshot.conversations.len()
        );

        Ok(Self {
            path,
            inner: InMemoryDirectory::from_snapshot(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<(), RepositoryError> {
        let snapshot = self.inner.snapshot().await;
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(storage_error)?;
        }
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).await.map_err(storage_error)?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(storage_error)?;
        tracing::trace!("Directory snapshot written to {}", self.path.display());
        Ok(())
    }

    /// 変更操作を始める（終わるまで他の変更操作は待たされる）
    async fn begin(&self) -> PendingWrite<'_> {
        let guard = self.write_lock.lock().await;
        PendingWrite {
            before: self.inner.snapshot().await,
            _guard: guard,
        }
    }

    /// 変更を書き出す。失敗した場合は変更前の状態に戻す
    async fn commit<T>(
        &self,
        pending: PendingWrite<'_>,
        result: Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let value = result?;
        if let Err(e) = self.flush().await {
            tracing::error!("Failed to persist directory snapshot, rolled back: {}", e);
            self.inner.restore(pending.before).await;
            return Err(e);
        }
        Ok(value)
    }
}

fn storage_error(e: std::io::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

#[async_trait]
impl UserRepository for JsonFileDirectory {
    async fn get_user(&self, user_id: &UserId) -> Result<User, RepositoryError> {
        self.inner.get_user(user_id).await
    }

    async fn ensure_user(
        &self,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<User, RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.ensure_user(user_id, display_name).await;
        self.commit(pending, result).await
    }

    async fn set_presence(
        &self,
        user_id: &UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.set_presence(user_id, is_online, last_seen).await;
        self.commit(pending, result).await
    }
}

#[async_trait]
impl ConversationRepository for JsonFileDirectory {
    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Conversation, RepositoryError> {
        self.inner.get_conversation(conversation_id).await
    }

    async fn list_conversations_for(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        self.inner.list_conversations_for(user_id).await
    }

    async fn find_or_create_direct(
        &self,
        candidate: Conversation,
    ) -> Result<(Conversation, bool), RepositoryError> {
        let pending = self.begin().await;
        let (conversation, created) = self.inner.find_or_create_direct(candidate).await?;
        if created {
            self.commit(pending, Ok(())).await?;
        }
        Ok((conversation, created))
    }

    async fn create_group(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.create_group(conversation).await;
        self.commit(pending, result).await
    }

    async fn add_participants(
        &self,
        conversation_id: &ConversationId,
        user_ids: Vec<UserId>,
        now: Timestamp,
    ) -> Result<(Conversation, Vec<UserId>), RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.add_participants(conversation_id, user_ids, now).await;
        self.commit(pending, result).await
    }

    async fn remove_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.remove_participant(conversation_id, user_id, now).await;
        self.commit(pending, result).await
    }

    async fn add_admin(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Conversation, RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.add_admin(conversation_id, user_id, now).await;
        self.commit(pending, result).await
    }
}

#[async_trait]
impl MessageRepository for JsonFileDirectory {
    async fn append_message(&self, message: Message) -> Result<Conversation, RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.append_message(message).await;
        self.commit(pending, result).await
    }

    async fn mark_read(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<Vec<MessageId>, RepositoryError> {
        let pending = self.begin().await;
        let touched = self.inner.mark_read(conversation_id, user_id).await?;
        if touched.is_empty() {
            return Ok(touched);
        }
        self.commit(pending, Ok(touched)).await
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.inner.list_messages(conversation_id).await
    }
}

#[async_trait]
impl NotificationRepository for JsonFileDirectory {
    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<(), RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.insert_notification(notification).await;
        self.commit(pending, result).await
    }

    async fn list_notifications(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.list_notifications(user_id).await
    }

    async fn mark_notification_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.mark_notification_read(user_id, notification_id).await;
        self.commit(pending, result).await
    }

    async fn mark_all_notifications_read(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<NotificationId>, RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.mark_all_notifications_read(user_id).await;
        self.commit(pending, result).await
    }

    async fn delete_notification(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), RepositoryError> {
        let pending = self.begin().await;
        let result = self.inner.delete_notification(user_id, notification_id).await;
        self.commit(pending, result).await
    }
}
