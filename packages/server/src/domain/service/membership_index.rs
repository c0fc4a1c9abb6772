//! Conversation Membership Index
//!
//! 会話 ID → 現在の参加者集合 のキャッシュ付きインデックス。
//! 配信ステータス（sent / delivered / seen）の計算とブロードキャスト先の判定に使います。
//!
//! 参加者を変更する操作の後は必ず [`MembershipIndex::invalidate`] を呼ぶこと。
//! キャッシュが古いと seen / delivered の判定が黙って誤ります。

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use tokio::sync::Mutex;

use crate::domain::{ConversationId, ConversationRepository, RepositoryError, UserId};

#[derive(Default)]
struct MembershipCache {
    participants: HashMap<ConversationId, BTreeSet<UserId>>,
    /// invalidate のたびに増える世代番号
    generations: HashMap<ConversationId, u64>,
}

impl MembershipCache {
    fn generation(&self, conversation_id: &ConversationId) -> u64 {
        self.generations.get(conversation_id).copied().unwrap_or(0)
    }
}

pub struct MembershipIndex {
    conversations: Arc<dyn ConversationRepository>,
    cache: Mutex<MembershipCache>,
}

impl MembershipIndex {
    pub fn new(conversations: Arc<dyn ConversationRepository>) -> Self {
        Self {
            conversations,
            cache: Mutex::new(MembershipCache::default()),
        }
    }

    /// 現在の参加者集合を取得
    ///
    /// キャッシュにない場合は Repository から読み込む。読み込み中に invalidate
    /// された場合、読み込んだ値はキャッシュしない。
    pub async fn participants_of(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<BTreeSet<UserId>, RepositoryError> {
        let generation = {
            let cache = self.cache.lock().await;
            if let Some(participants) = cache.participants.get(conversation_id) {
                return Ok(participants.clone());
            }
            cache.generation(conversation_id)
        };

        // ロックを解放してからストアにアクセスする
        let conversation = self.conversations.get_conversation(conversation_id).await?;

        let mut cache = self.cache.lock().await;
        if cache.generation(conversation_id) == generation {
            cache
                .participants
                .insert(conversation_id.clone(), conversation.participants.clone());
        }
        Ok(conversation.participants)
    }

    pub async fn is_participant(
        &self,
        conversation_id: &ConversationId,
        user_id: &UserId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .participants_of(conversation_id)
            .await?
            .contains(user_id))
    }

    /// 参加者を変更する操作の後に呼び出す
    pub async fn invalidate(&self, conversation_id: &ConversationId) {
        let mut cache = self.cache.lock().await;
        cache.participants.remove(conversation_id);
        *cache
            .generations
            .entry(conversation_id.clone())
            .or_insert(0) += 1;
        tracing::debug!("Membership cache invalidated for '{}'", conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Conversation, GroupProfile, MockConversationRepository, Timestamp};

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn group(id: &ConversationId, members: &[&str]) -> Conversation {
        Conversation::group(
            id.clone(),
            user("alice"),
            members.iter().map(|m| user(m)),
            GroupProfile::default(),
            Timestamp::new(1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_participants_are_cached_after_first_read() {
        // テスト項目: 2 回目以降の参照ではストアにアクセスしない
        // given (前提条件):
        let conversation_id = ConversationId::generate();
        let stored = group(&conversation_id, &["bob"]);
        let mut repository = MockConversationRepository::new();
        repository
            .expect_get_conversation()
            .times(1)
            .returning(move |_| Ok(stored.clone()));
        let index = MembershipIndex::new(Arc::new(repository));

        // when (操作):
        let first = index.participants_of(&conversation_id).await.unwrap();
        let second = index.participants_of(&conversation_id).await.unwrap();

        // then (期待する結果):
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload_of_current_members() {
        // テスト項目: invalidate 後は最新の参加者集合が読み込まれる
        // given (前提条件):
        let conversation_id = ConversationId::generate();
        let before = group(&conversation_id, &["bob"]);
        let after = group(&conversation_id, &["bob", "charlie"]);
        let mut repository = MockConversationRepository::new();
        let mut sequence = mockall::Sequence::new();
        repository
            .expect_get_conversation()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(move |_| Ok(before.clone()));
        repository
            .expect_get_conversation()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(move |_| Ok(after.clone()));
        let index = MembershipIndex::new(Arc::new(repository));
        index.participants_of(&conversation_id).await.unwrap();

        // when (操作):
        index.invalidate(&conversation_id).await;
        let reloaded = index.participants_of(&conversation_id).await.unwrap();

        // then (期待する結果):
        assert_eq!(reloaded.len(), 3);
        assert!(
            index
                .is_participant(&conversation_id, &user("charlie"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_conversation_is_not_found() {
        // テスト項目: 存在しない会話は NotFound エラーになり、キャッシュされない
        // given (前提条件):
        let conversation_id = ConversationId::generate();
        let mut repository = MockConversationRepository::new();
        repository
            .expect_get_conversation()
            .times(2)
            .returning(|id| Err(RepositoryError::ConversationNotFound(id.to_string())));
        let index = MembershipIndex::new(Arc::new(repository));

        // when (操作):
        let first = index.participants_of(&conversation_id).await;
        let second = index.participants_of(&conversation_id).await;

        // then (期待する結果):
        assert!(matches!(first, Err(RepositoryError::ConversationNotFound(_))));
        assert!(matches!(second, Err(RepositoryError::ConversationNotFound(_))));
    }
}
