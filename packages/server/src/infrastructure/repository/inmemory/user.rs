//! UserRepository のインメモリ実装

use async_trait::async_trait;

use super::InMemoryDirectory;
use crate::domain::{RepositoryError, Timestamp, User, UserId, UserRepository};

#[async_trait]
impl UserRepository for InMemoryDirectory {
    async fn get_user(&self, user_id: &UserId) -> Result<User, RepositoryError> {
        self.state
            .lock()
            .await
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| RepositoryError::UserNotFound(user_id.to_string()))
    }

    async fn ensure_user(
        &self,
        user_id: &UserId,
        display_name: &str,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .entry(user_id.clone())
            .or_insert_with(|| User::new(user_id.clone(), display_name.to_string()));
        if user.display_name != display_name {
            user.display_name = display_name.to_string();
        }
        Ok(user.clone())
    }

    async fn set_presence(
        &self,
        user_id: &UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| RepositoryError::UserNotFound(user_id.to_string()))?;
        user.is_online = is_online;
        user.last_seen = Some(last_seen);
        Ok(())
    }
}
