//! Presence Registry
//!
//! ユーザー ID → 接続中の接続 ID 集合 を管理します。
//! 「ユーザーがオンラインか」の唯一の情報源です。
//!
//! ## 不変条件
//!
//! - エントリが存在する ⇔ 接続が 1 つ以上ある
//! - 最後の接続を削除したときだけエントリが消え、オフライン遷移となる
//!
//! Registry 自身はブロードキャストしません。遷移を呼び出し元に返すだけです。

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::domain::{ConnectionId, UserId};

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: Mutex<HashMap<UserId, HashSet<ConnectionId>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接続を登録する
    ///
    /// このユーザーの最初の接続であれば `true`（オンラインへの遷移）を返す。
    pub async fn register(&self, user_id: &UserId, connection_id: &ConnectionId) -> bool {
        let mut entries = self.entries.lock().await;
        let connections = entries.entry(user_id.clone()).or_default();
        let came_online = connections.is_empty();
        connections.insert(connection_id.clone());
        came_online
    }

    /// 接続を登録解除する
    ///
    /// 最後の接続を削除した場合のみ `true`（オフラインへの遷移）を返す。
    /// 登録されていない接続の削除は何もしない。
    pub async fn unregister(&self, user_id: &UserId, connection_id: &ConnectionId) -> bool {
        let mut entries = self.entries.lock().await;
        let Some(connections) = entries.get_mut(user_id) else {
            return false;
        };
        if !connections.remove(connection_id) {
            return false;
        }
        if connections.is_empty() {
            entries.remove(user_id);
            return true;
        }
        false
    }

    pub async fn is_online(&self, user_id: &UserId) -> bool {
        self.entries.lock().await.contains_key(user_id)
    }

    pub async fn connections_of(&self, user_id: &UserId) -> HashSet<ConnectionId> {
        self.entries
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// 複数ユーザーの接続をまとめて取得
    pub async fn connections_of_all<'a>(
        &self,
        user_ids: impl IntoIterator<Item = &'a UserId>,
    ) -> Vec<ConnectionId> {
        let entries = self.entries.lock().await;
        user_ids
            .into_iter()
            .filter_map(|user_id| entries.get(user_id))
            .flat_map(|connections| connections.iter().cloned())
            .collect()
    }

    /// オンラインのユーザー一覧（ID 順）
    pub async fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.entries.lock().await.keys().cloned().collect();
        users.sort();
        users
    }

    /// 全ての接続（グローバルブロードキャスト用）
    pub async fn all_connections(&self) -> Vec<ConnectionId> {
        self.entries
            .lock()
            .await
            .values()
            .flat_map(|connections| connections.iter().cloned())
            .collect()
    }

    /// ユーザーごとの接続数（ID 順）
    pub async fn connection_counts(&self) -> Vec<(UserId, usize)> {
        let mut counts: Vec<(UserId, usize)> = self
            .entries
            .lock()
            .await
            .iter()
            .map(|(user_id, connections)| (user_id.clone(), connections.len()))
            .collect();
        counts.sort();
        counts
    }
}
