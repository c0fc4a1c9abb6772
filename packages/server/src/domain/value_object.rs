//! チャットドメインの値オブジェクト
//!
//! ID は生成時に検証される不透明な文字列で、UseCase に届く ID は空でなく長さの上限内にあります。
//! シリアライズ時はただの文字列になります。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// ID の最大長（バイト）
pub const MAX_ID_LENGTH: usize = 128;

/// メッセージ本文の最大長（文字数）
pub const MAX_MESSAGE_CONTENT_LENGTH: usize = 4000;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                if value.trim().is_empty() {
                    return Err(ValueObjectError::EmptyId(stringify!($name)));
                }
                if value.len() > MAX_ID_LENGTH {
                    return Err(ValueObjectError::IdTooLong {
                        kind: stringify!($name),
                        max: MAX_ID_LENGTH,
                    });
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValueObjectError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

macro_rules! generated_id {
    ($name:ident) => {
        impl $name {
            /// ランダムな ID（UUID v4）を生成する
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }
        }
    };
}

string_id!(
    /// Identity Verifier が発行するユーザー ID
    UserId
);
string_id!(
    /// 1 本の接続の ID
    ConnectionId
);
string_id!(
    /// 会話 ID（ルーム ID を兼ねる）
    ConversationId
);
string_id!(
    /// メッセージ ID
    MessageId
);
string_id!(
    /// 通知 ID
    NotificationId
);

generated_id!(ConnectionId);
generated_id!(ConversationId);
generated_id!(MessageId);
generated_id!(NotificationId);

/// Unix タイムスタンプ（ミリ秒, UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// メッセージ本文
///
/// 空白以外の文字を 1 文字以上含み、[`MAX_MESSAGE_CONTENT_LENGTH`] 文字以内であること。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyContent);
        }
        if value.chars().count() > MAX_MESSAGE_CONTENT_LENGTH {
            return Err(ValueObjectError::ContentTooLong {
                max: MAX_MESSAGE_CONTENT_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageContent> for String {
    fn from(content: MessageContent) -> Self {
        content.0
    }
}
