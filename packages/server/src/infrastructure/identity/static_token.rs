//! 固定トークン表による IdentityVerifier
//!
//! トークンファイルの形式:
//!
//! ```json
//! {
//!   "alice-token": { "userId": "alice", "displayName": "Alice" },
//!   "bob-token": { "userId": "bob", "displayName": "Bob" }
//! }
//! ```

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;

use crate::domain::{AuthError, IdentityVerifier, VerifiedIdentity};

#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, VerifiedIdentity>,
}

impl StaticTokenVerifier {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, VerifiedIdentity)>) -> Self {
        Self {
            tokens: entries.into_iter().collect(),
        }
    }

    /// トークンファイルを読み込む
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AuthError::Unavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let tokens: HashMap<String, VerifiedIdentity> = serde_json::from_str(&content)
            .map_err(|e| {
                AuthError::Unavailable(format!("failed to parse {}: {}", path.display(), e))
            })?;
        tracing::info!("Loaded {} token(s) from {}", tokens.len(), path.display());
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }
}
