//! ドメインエンティティ: ユーザー・会話・メッセージ・通知

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{
    error::DomainError,
    value_object::{ConversationId, MessageContent, MessageId, NotificationId, Timestamp, UserId},
};

/// ディレクトリに登録されているユーザー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub is_online: bool,
    pub last_seen: Option<Timestamp>,
}

impl User {
    pub fn new(id: UserId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            is_online: false,
            last_seen: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Direct,
    Group,
}

/// グループ会話の任意の説明項目
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
}

/// ダイレクト（2 人）またはグループの会話
///
/// 不変条件:
/// - ダイレクト会話の参加者はちょうど 2 人
/// - グループの管理者は参加者の部分集合で、参加者がいる限り空にならない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    pub participants: BTreeSet<UserId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub admins: BTreeSet<UserId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub last_message_id: Option<MessageId>,
}

impl Conversation {
    /// 異なる 2 人のダイレクト会話を作成する
    pub fn direct(
        id: ConversationId,
        first: UserId,
        second: UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if first == second {
            return Err(DomainError::InvalidParticipants(
                "a direct conversation needs two distinct users".to_string(),
            ));
        }

        Ok(Self {
            id,
            kind: ConversationKind::Direct,
            participants: BTreeSet::from([first, second]),
            name: None,
            description: None,
            picture: None,
            admins: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            last_message_id: None,
        })
    }

    /// グループ会話を作成する（作成者が最初の管理者になる）
    pub fn group(
        id: ConversationId,
        creator: UserId,
        members: impl IntoIterator<Item = UserId>,
        profile: GroupProfile,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let mut participants: BTreeSet<UserId> = members.into_iter().collect();
        participants.insert(creator.clone());
        if participants.len() < 2 {
            return Err(DomainError::InvalidParticipants(
                "a group needs at least one member besides its creator".to_string(),
            ));
        }

        Ok(Self {
            id,
            kind: ConversationKind::Group,
            participants,
            name: profile.name,
            description: profile.description,
            picture: profile.picture,
            admins: BTreeSet::from([creator]),
            created_at: now,
            updated_at: now,
            last_message_id: None,
        })
    }

    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }

    pub fn is_admin(&self, user_id: &UserId) -> bool {
        self.admins.contains(user_id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// `first` と `second` の 2 人のダイレクト会話かどうか
    pub fn is_direct_between(&self, first: &UserId, second: &UserId) -> bool {
        self.kind == ConversationKind::Direct
            && self.participants.len() == 2
            && self.participants.contains(first)
            && self.participants.contains(second)
    }

    /// グループに参加者を追加し、新たに参加したユーザーを返す
    pub fn add_participants(
        &mut self,
        users: impl IntoIterator<Item = UserId>,
        now: Timestamp,
    ) -> Result<Vec<UserId>, DomainError> {
        if !self.is_group() {
            return Err(DomainError::InvalidParticipants(
                "members cannot be added to a direct conversation".to_string(),
            ));
        }

        let added: Vec<UserId> = users
            .into_iter()
            .filter(|user| self.participants.insert(user.clone()))
            .collect();
        if !added.is_empty() {
            self.updated_at = now;
        }
        Ok(added)
    }

    /// グループから参加者を削除する
    ///
    /// 管理者がいなくなる場合は、残った参加者のうち ID が最小のユーザーを管理者にする。
    pub fn remove_participant(&mut self, user_id: &UserId, now: Timestamp) -> Result<(), DomainError> {
        if !self.is_group() {
            return Err(DomainError::InvalidParticipants(
                "members cannot be removed from a direct conversation".to_string(),
            ));
        }
        if !self.participants.remove(user_id) {
            return Err(DomainError::NotParticipant(user_id.to_string()));
        }

        self.admins.remove(user_id);
        if self.admins.is_empty()
            && let Some(successor) = self.participants.first().cloned()
        {
            self.admins.insert(successor);
        }
        self.updated_at = now;
        Ok(())
    }

    /// 参加者に管理者権限を付与する
    pub fn promote_admin(&mut self, user_id: &UserId, now: Timestamp) -> Result<(), DomainError> {
        if !self.is_participant(user_id) {
            return Err(DomainError::NotParticipant(user_id.to_string()));
        }
        if self.admins.insert(user_id.clone()) {
            self.updated_at = now;
        }
        Ok(())
    }

    /// 最新メッセージの参照を更新する
    pub fn record_message(&mut self, message_id: MessageId, at: Timestamp) {
        self.last_message_id = Some(message_id);
        self.updated_at = at;
    }
}

/// メッセージの種別
///
/// 既知の種別以外は `Other` としてそのままの文字列で保存・配信する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    File,
    Voice,
    System,
    #[serde(untagged)]
    Other(String),
}

/// 既読ユーザーの集合から導出する配信状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Seen,
}

impl DeliveryStatus {
    /// 既読が 2 人未満なら `sent`、参加者全員が既読なら `seen`、その間は `delivered`
    pub fn from_counts(read_count: usize, participant_count: usize) -> Self {
        if read_count < 2 {
            Self::Sent
        } else if read_count >= participant_count {
            Self::Seen
        } else {
            Self::Delivered
        }
    }
}

/// チャットメッセージ（`read_by` 以外は変更しない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: MessageContent,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub reply_to_id: Option<MessageId>,
    pub created_at: Timestamp,
    pub read_by: BTreeSet<UserId>,
}

impl Message {
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: MessageContent,
        message_type: MessageType,
        reply_to_id: Option<MessageId>,
        created_at: Timestamp,
    ) -> Self {
        let read_by = BTreeSet::from([sender_id.clone()]);
        Self {
            id,
            conversation_id,
            sender_id,
            content,
            message_type,
            reply_to_id,
            created_at,
            read_by,
        }
    }

    /// `user_id` を既読として記録する
    ///
    /// 送信者以外で、まだ既読になっていなかった場合のみ `true` を返す。
    pub fn mark_read_by(&mut self, user_id: &UserId) -> bool {
        if &self.sender_id == user_id {
            return false;
        }
        self.read_by.insert(user_id.clone())
    }

    pub fn status(&self, participant_count: usize) -> DeliveryStatus {
        DeliveryStatus::from_counts(self.read_by.len(), participant_count)
    }
}

/// 読み出した時点の配信状態付きのメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub status: DeliveryStatus,
}

impl MessageView {
    pub fn new(message: Message, participant_count: usize) -> Self {
        let status = message.status(participant_count);
        Self { message, status }
    }
}

/// 1 人のユーザー宛ての通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at: Timestamp,
}
