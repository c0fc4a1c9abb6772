//! UseCase: 会話の作成
//!
//! - ダイレクト: 同じ 2 人の会話が既にあればそれを返す（ストア側で検索と作成をアトミックに行う）
//! - グループ: 作成者が最初の管理者になる
//!
//! 参加者のライブ接続をルームに参加させ、`conversation:new` を送ります。
//! 既存のダイレクト会話が返された場合は、依頼したユーザーの接続にだけ送ります。

use std::{collections::BTreeSet, sync::Arc};

use tsudoi_shared::time::Clock;

use crate::domain::{
    Conversation, ConversationId, ConversationKind, ConversationRepository, GroupProfile,
    MembershipIndex, PresenceRegistry, RoomRouter, ServerEvent, Timestamp, UserId,
};

use super::error::ConversationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateConversationCommand {
    pub requester: UserId,
    pub kind: ConversationKind,
    /// 依頼者を含んでいてもよい
    pub participant_ids: Vec<UserId>,
    pub profile: GroupProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedConversation {
    pub conversation: Conversation,
    /// false の場合は既存のダイレクト会話
    pub created: bool,
}

pub struct CreateConversationUseCase {
    conversations: Arc<dyn ConversationRepository>,
    membership: Arc<MembershipIndex>,
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRouter>,
    clock: Arc<dyn Clock>,
}

impl CreateConversationUseCase {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        membership: Arc<MembershipIndex>,
        presence: Arc<PresenceRegistry>,
        rooms: Arc<RoomRouter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversations,
            membership,
            presence,
            rooms,
            clock,
        }
    }

    pub async fn execute(
        &self,
        command: CreateConversationCommand,
    ) -> Result<CreatedConversation, ConversationError> {
        let now = Timestamp::new(self.clock.now_millis());
        let (conversation, created) = match command.kind {
            ConversationKind::Direct => {
                let others: BTreeSet<UserId> = command
                    .participant_ids
                    .into_iter()
                    .filter(|user_id| *user_id != command.requester)
                    .collect();
                let mut others = others.into_iter();
                let (Some(other), None) = (others.next(), others.next()) else {
                    return Err(ConversationError::InvalidParticipants(
                        "a direct conversation needs exactly one other user".to_string(),
                    ));
                };
                let candidate =
                    Conversation::direct(ConversationId::generate(), command.requester.clone(), other, now)?;
                self.conversations.find_or_create_direct(candidate).await?
            }
            ConversationKind::Group => {
                let candidate = Conversation::group(
                    ConversationId::generate(),
                    command.requester.clone(),
                    command.participant_ids,
                    command.profile,
                    now,
                )?;
                (self.conversations.create_group(candidate).await?, true)
            }
        };
        self.membership.invalidate(&conversation.id).await;

        let participant_connections = self
            .presence
            .connections_of_all(conversation.participants.iter())
            .await;
        self.rooms
            .join_all(&participant_connections, &conversation.id)
            .await;

        let recipients = if created {
            participant_connections
        } else {
            self.presence
                .connections_of(&command.requester)
                .await
                .into_iter()
                .collect()
        };
        self.rooms
            .send_to(
                recipients,
                &ServerEvent::ConversationNew {
                    conversation: conversation.clone(),
                },
            )
            .await;

        tracing::info!(
            "Conversation '{}' ({:?}) {} by '{}'",
            conversation.id,
            conversation.kind,
            if created { "created" } else { "reused" },
            command.requester
        );
        Ok(CreatedConversation {
            conversation,
            created,
        })
    }
}
