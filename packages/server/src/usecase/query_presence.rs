//! UseCase: プレゼンスの問い合わせ（読み取り専用）
//!
//! オンラインかどうかは Presence Registry（ライブ接続）を正とし、
//! 最終接続時刻だけをストアから読みます。

use std::sync::Arc;

use crate::domain::{PresenceRegistry, Timestamp, UserId, UserRepository};

use super::error::PresenceQueryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStatusView {
    pub user_id: UserId,
    pub is_online: bool,
    pub last_seen: Option<Timestamp>,
}

pub struct QueryPresenceUseCase {
    users: Arc<dyn UserRepository>,
    presence: Arc<PresenceRegistry>,
}

impl QueryPresenceUseCase {
    pub fn new(users: Arc<dyn UserRepository>, presence: Arc<PresenceRegistry>) -> Self {
        Self { users, presence }
    }

    pub async fn online_users(&self) -> Vec<UserId> {
        self.presence.online_users().await
    }

    pub async fn user_status(&self, user_id: &UserId) -> Result<UserStatusView, PresenceQueryError> {
        let user = self.users.get_user(user_id).await?;
        Ok(UserStatusView {
            is_online: self.presence.is_online(user_id).await,
            user_id: user.id,
            last_seen: user.last_seen,
        })
    }

    /// `/debug/presence` 用
    pub async fn connection_counts(&self) -> Vec<(UserId, usize)> {
        self.presence.connection_counts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{Fixture, user};

    fn usecase(fixture: &Fixture) -> QueryPresenceUseCase {
        QueryPresenceUseCase::new(fixture.repositories.users.clone(), fixture.presence.clone())
    }

    #[tokio::test]
    async fn test_user_status_reads_live_presence() {
        // テスト項目: 接続中のユーザーはオンライン、登録のみのユーザーはオフライン
        // given (前提条件):
        let fixture = Fixture::new();
        let _alice = fixture.connect("alice").await;
        fixture.seed_user("bob").await;
        let usecase = usecase(&fixture);

        // when (操作):
        let alice = usecase.user_status(&user("alice")).await.unwrap();
        let bob = usecase.user_status(&user("bob")).await.unwrap();

        // then (期待する結果):
        assert!(alice.is_online);
        assert!(!bob.is_online);
        assert_eq!(bob.last_seen, None);
        assert_eq!(usecase.online_users().await, vec![user("alice")]);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        // テスト項目: 存在しないユーザーの問い合わせは UserNotFound
        // given (前提条件):
        let fixture = Fixture::new();

        // when (操作):
        let result = usecase(&fixture).user_status(&user("ghost")).await;

        // then (期待する結果):
        assert_eq!(result, Err(PresenceQueryError::UserNotFound));
    }

    #[tokio::test]
    async fn test_connection_counts_per_user() {
        // テスト項目: ユーザーごとの接続数が ID 順に返る
        // given (前提条件):
        let fixture = Fixture::new();
        let _bob = fixture.connect("bob").await;
        let _alice_phone = fixture.connect("alice").await;
        let _alice_laptop = fixture.connect("alice").await;

        // when (操作):
        let counts = usecase(&fixture).connection_counts().await;

        // then (期待する結果):
        assert_eq!(counts, vec![(user("alice"), 2), (user("bob"), 1)]);
    }
}
