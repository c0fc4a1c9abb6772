//! UseCase layer: one use case per inbound operation.

pub mod connect_session;
pub mod create_conversation;
pub mod disconnect_session;
pub mod error;
pub mod list_messages;
pub mod manage_group;
pub mod manage_notifications;
pub mod mark_read;
pub mod notification_fan_out;
pub mod notify_typing;
pub mod query_presence;
pub mod room_subscription;
pub mod send_message;

#[cfg(test)]
mod test_support;

pub use connect_session::{ActiveSession, ConnectSessionUseCase};
pub use create_conversation::{
    CreateConversationCommand, CreateConversationUseCase, CreatedConversation,
};
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::{
    ConnectError, ConversationError, DeliveryError, NotificationError, PresenceQueryError,
};
pub use list_messages::ListMessagesUseCase;
pub use manage_group::ManageGroupUseCase;
pub use manage_notifications::ManageNotificationsUseCase;
pub use mark_read::MarkReadUseCase;
pub use notification_fan_out::NotificationFanOut;
pub use notify_typing::NotifyTypingUseCase;
pub use query_presence::{QueryPresenceUseCase, UserStatusView};
pub use room_subscription::RoomSubscriptionUseCase;
pub use send_message::{SendMessageCommand, SendMessageUseCase};
