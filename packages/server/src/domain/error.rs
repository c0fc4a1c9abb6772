//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    EmptyId(&'static str),

    #[error("{kind} must be at most {max} bytes")]
    IdTooLong { kind: &'static str, max: usize },

    #[error("message content must not be empty")]
    EmptyContent,

    #[error("message content must be at most {max} characters")]
    ContentTooLong { max: usize },
}

/// 会話の不変条件違反
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid participants: {0}")]
    InvalidParticipants(String),

    #[error("user '{0}' is not a participant")]
    NotParticipant(String),
}

/// Repository のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("conversation '{0}' not found")]
    ConversationNotFound(String),

    #[error("notification '{0}' not found")]
    NotificationNotFound(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// MessagePusher のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}
