//! UseCase 層のエラー型
//!
//! `Display` はログ用の詳細、`user_message()` はクライアントに返す短い文言です。
//! クライアント向けの文言には内部の詳細（ストアのエラー内容など）を含めません。

use thiserror::Error;

use crate::domain::{AuthError, DomainError, RepositoryError};

/// セッション接続時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("missing or invalid credential")]
    Unauthenticated,

    #[error("identity verifier unavailable: {0}")]
    VerifierUnavailable(String),

    #[error("failed to load session state: {0}")]
    Repository(String),
}

impl From<AuthError> for ConnectError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredential => Self::Unauthenticated,
            AuthError::Unavailable(detail) => Self::VerifierUnavailable(detail),
        }
    }
}

/// メッセージの送信・既読・取得・入力中通知のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("conversation not found")]
    ConversationNotFound,

    #[error("user is not a participant of the conversation")]
    NotParticipant,

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl DeliveryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ConversationNotFound => "Conversation not found",
            Self::NotParticipant => "Not a participant of this conversation",
            Self::Persistence(_) => "Failed to process message",
        }
    }
}

impl From<RepositoryError> for DeliveryError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::ConversationNotFound(_) => Self::ConversationNotFound,
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// 会話の作成・購読・グループ管理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("conversation not found")]
    ConversationNotFound,

    #[error("user is not a participant of the conversation")]
    NotParticipant,

    #[error("user is not an admin of the group")]
    NotAdmin,

    #[error("operation requires a group conversation")]
    NotGroup,

    #[error("invalid participants: {0}")]
    InvalidParticipants(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ConversationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ConversationNotFound => "Conversation not found",
            Self::NotParticipant => "Not a participant of this conversation",
            Self::NotAdmin => "Only group admins can do that",
            Self::NotGroup => "Not a group conversation",
            Self::InvalidParticipants(_) => "Invalid participants",
            Self::Persistence(_) => "Failed to update conversation",
        }
    }
}

impl From<RepositoryError> for ConversationError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::ConversationNotFound(_) => Self::ConversationNotFound,
            RepositoryError::Domain(DomainError::NotParticipant(_)) => Self::NotParticipant,
            RepositoryError::Domain(DomainError::InvalidParticipants(detail)) => {
                Self::InvalidParticipants(detail)
            }
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<DomainError> for ConversationError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotParticipant(_) => Self::NotParticipant,
            DomainError::InvalidParticipants(detail) => Self::InvalidParticipants(detail),
        }
    }
}

/// 通知管理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("notification not found")]
    NotificationNotFound,

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl NotificationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotificationNotFound => "Notification not found",
            Self::Persistence(_) => "Failed to update notifications",
        }
    }
}

impl From<RepositoryError> for NotificationError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotificationNotFound(_) => Self::NotificationNotFound,
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// プレゼンス問い合わせのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenceQueryError {
    #[error("user not found")]
    UserNotFound,

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl PresenceQueryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UserNotFound => "User not found",
            Self::Persistence(_) => "Failed to load user status",
        }
    }
}

impl From<RepositoryError> for PresenceQueryError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::UserNotFound(_) => Self::UserNotFound,
            other => Self::Persistence(other.to_string()),
        }
    }
}
