//! InMemory Directory Store 実装
//!
//! ドメイン層が定義する 4 つの Repository trait（users / conversations /
//! messages / notifications）を 1 つのインメモリストアで実装します。
//!
//! 全ての状態を 1 つの Mutex で保護するため、各操作（集合の和・削除、
//! find-or-create）はアトミックになります。ロック中に await はしません。

mod conversation;
mod message;
mod notification;
mod user;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{Conversation, ConversationId, Message, Notification, User, UserId};

/// ストア全体の状態（JSON スナップショットの形式も兼ねる）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    #[serde(default)]
    pub conversations: BTreeMap<ConversationId, Conversation>,
    /// 会話ごとのメッセージ（作成順）
    #[serde(default)]
    pub messages: BTreeMap<ConversationId, Vec<Message>>,
    /// ユーザーごとの通知（作成順）
    #[serde(default)]
    pub notifications: BTreeMap<UserId, Vec<Notification>>,
}

/// インメモリ Directory Store
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectorySnapshot>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存のスナップショットから復元する
    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// 現在の状態のコピーを取得する
    pub async fn snapshot(&self) -> DirectorySnapshot {
        self.state.lock().await.clone()
    }

    /// 状態をスナップショットの内容に置き換える
    pub async fn restore(&self, snapshot: DirectorySnapshot) {
        *self.state.lock().await = snapshot;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::{
        Conversation, ConversationId, GroupProfile, Message, MessageContent, MessageId,
        MessageType, Timestamp, UserId,
    };

    pub fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    pub fn group(creator: &str, members: &[&str]) -> Conversation {
        Conversation::group(
            ConversationId::generate(),
            user(creator),
            members.iter().map(|m| user(m)),
            GroupProfile {
                name: Some("Team".to_string()),
                ..GroupProfile::default()
            },
            Timestamp::new(1000),
        )
        .unwrap()
    }

    pub fn text_message(conversation_id: &ConversationId, sender: &str, at: i64) -> Message {
        Message::new(
            MessageId::generate(),
            conversation_id.clone(),
            user(sender),
            MessageContent::new(format!("message at {}", at)).unwrap(),
            MessageType::Text,
            None,
            Timestamp::new(at),
        )
    }
}
