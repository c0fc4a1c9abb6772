//! 認証のインターフェース
//!
//! 認証情報の発行はこのサービスの外で行います。接続はトークンを提示するだけで、
//! [`IdentityVerifier`] がそれをユーザー ID に変換します。

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::UserId;

/// 検証に成功したユーザーの情報
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("identity verifier unavailable: {0}")]
    Unavailable(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// トークンを検証する
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}
