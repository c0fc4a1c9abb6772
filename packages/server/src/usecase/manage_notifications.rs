//! UseCase: 通知の一覧・既読・削除
//!
//! 通知に触れられるのは所有者だけです（他人の通知は NotFound として扱う）。

use std::sync::Arc;

use crate::domain::{Notification, NotificationId, NotificationRepository, UserId};

use super::error::NotificationError;

pub struct ManageNotificationsUseCase {
    notifications: Arc<dyn NotificationRepository>,
}

impl ManageNotificationsUseCase {
    pub fn new(notifications: Arc<dyn NotificationRepository>) -> Self {
        Self { notifications }
    }

    /// 新しい順
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.notifications.list_notifications(user_id).await?)
    }

    pub async fn mark_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<Vec<NotificationId>, NotificationError> {
        self.notifications
            .mark_notification_read(user_id, notification_id)
            .await?;
        Ok(vec![notification_id.clone()])
    }

    /// 未読の通知を全て既読にし、変更した ID を返す
    pub async fn mark_all_read(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<NotificationId>, NotificationError> {
        Ok(self
            .notifications
            .mark_all_notifications_read(user_id)
            .await?)
    }

    pub async fn delete(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), NotificationError> {
        self.notifications
            .delete_notification(user_id, notification_id)
            .await?;
        tracing::debug!("'{}' deleted notification '{}'", user_id, notification_id);
        Ok(())
    }
}
