//! NotificationRepository のインメモリ実装

use std::cmp::Reverse;

use async_trait::async_trait;

use super::InMemoryDirectory;
use crate::domain::{
    Notification, NotificationId, NotificationRepository, RepositoryError, UserId,
};

fn not_found(notification_id: &NotificationId) -> RepositoryError {
    RepositoryError::NotificationNotFound(notification_id.to_string())
}

#[async_trait]
impl NotificationRepository for InMemoryDirectory {
    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<(), RepositoryError> {
        self.state
            .lock()
            .await
            .notifications
            .entry(notification.user_id.clone())
            .or_default()
            .push(notification);
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let state = self.state.lock().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .get(user_id)
            .map(|list| list.iter().rev().cloned().collect())
            .unwrap_or_default();
        // 同時刻のものは後から作成された方を先に（安定ソート）
        notifications.sort_by_key(|notification| Reverse(notification.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let notification = state
            .notifications
            .get_mut(user_id)
            .and_then(|list| list.iter_mut().find(|n| &n.id == notification_id))
            .ok_or_else(|| not_found(notification_id))?;
        notification.is_read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<NotificationId>, RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(list) = state.notifications.get_mut(user_id) else {
            return Ok(Vec::new());
        };
        Ok(list
            .iter_mut()
            .filter(|notification| !notification.is_read)
            .map(|notification| {
                notification.is_read = true;
                notification.id.clone()
            })
            .collect())
    }

    async fn delete_notification(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let list = state
            .notifications
            .get_mut(user_id)
            .ok_or_else(|| not_found(notification_id))?;
        let position = list
            .iter()
            .position(|n| &n.id == notification_id)
            .ok_or_else(|| not_found(notification_id))?;
        list.remove(position);
        Ok(())
    }
}
