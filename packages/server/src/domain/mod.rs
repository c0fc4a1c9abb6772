//! Domain layer: entities, value objects, events and the interfaces the
//! outer layers implement.

pub mod entity;
pub mod error;
pub mod event;
pub mod identity;
pub mod message_pusher;
pub mod repository;
pub mod service;
pub mod value_object;

pub use entity::{
    Conversation, ConversationKind, DeliveryStatus, GroupProfile, Message, MessageType,
    MessageView, Notification, User,
};
pub use error::{DomainError, MessagePushError, RepositoryError, ValueObjectError};
pub use event::ServerEvent;
pub use identity::{AuthError, IdentityVerifier, VerifiedIdentity};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::*;
pub use service::{MembershipIndex, PresenceRegistry, RoomRouter};
pub use value_object::{
    ConnectionId, ConversationId, MessageContent, MessageId, NotificationId, Timestamp, UserId,
};

#[cfg(test)]
pub use identity::MockIdentityVerifier;
