//! Server state: every use case, wired once per server.

use std::sync::Arc;

use tsudoi_shared::time::Clock;

use crate::{
    domain::{IdentityVerifier, MembershipIndex, PresenceRegistry, Repositories, RoomRouter},
    infrastructure::message_pusher::WebSocketMessagePusher,
    usecase::{
        ConnectSessionUseCase, CreateConversationUseCase, DisconnectSessionUseCase,
        ListMessagesUseCase, ManageGroupUseCase, ManageNotificationsUseCase, MarkReadUseCase,
        NotificationFanOut, NotifyTypingUseCase, QueryPresenceUseCase, RoomSubscriptionUseCase,
        SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub mark_read_usecase: Arc<MarkReadUseCase>,
    pub list_messages_usecase: Arc<ListMessagesUseCase>,
    pub notify_typing_usecase: Arc<NotifyTypingUseCase>,
    pub create_conversation_usecase: Arc<CreateConversationUseCase>,
    pub room_subscription_usecase: Arc<RoomSubscriptionUseCase>,
    pub manage_group_usecase: Arc<ManageGroupUseCase>,
    pub manage_notifications_usecase: Arc<ManageNotificationsUseCase>,
    pub query_presence_usecase: Arc<QueryPresenceUseCase>,
    /// Clock（HTTP レスポンスの生成時刻用）
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the domain services and use cases
    ///
    /// Initialization order:
    /// 1. MessagePusher
    /// 2. Presence Registry / Room Router / Membership Index
    /// 3. UseCases
    pub fn new(
        repositories: Repositories,
        verifier: Arc<dyn IdentityVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // 1. MessagePusher (WebSocket implementation)
        let message_pusher = Arc::new(WebSocketMessagePusher::new());

        // 2. Domain services
        let presence = Arc::new(PresenceRegistry::new());
        let rooms = Arc::new(RoomRouter::new(message_pusher.clone()));
        let membership = Arc::new(MembershipIndex::new(repositories.conversations.clone()));

        // 3. UseCases
        let fan_out = Arc::new(NotificationFanOut::new(
            repositories.users.clone(),
            repositories.notifications.clone(),
            presence.clone(),
            rooms.clone(),
            clock.clone(),
        ));

        Self {
            connect_session_usecase: Arc::new(ConnectSessionUseCase::new(
                verifier,
                repositories.users.clone(),
                repositories.conversations.clone(),
                message_pusher.clone(),
                presence.clone(),
                rooms.clone(),
                clock.clone(),
            )),
            disconnect_session_usecase: Arc::new(DisconnectSessionUseCase::new(
                repositories.users.clone(),
                message_pusher,
                presence.clone(),
                rooms.clone(),
                clock.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(
                repositories.messages.clone(),
                membership.clone(),
                rooms.clone(),
                fan_out,
                clock.clone(),
            )),
            mark_read_usecase: Arc::new(MarkReadUseCase::new(
                repositories.messages.clone(),
                membership.clone(),
                rooms.clone(),
            )),
            list_messages_usecase: Arc::new(ListMessagesUseCase::new(
                repositories.messages.clone(),
                membership.clone(),
            )),
            notify_typing_usecase: Arc::new(NotifyTypingUseCase::new(
                membership.clone(),
                rooms.clone(),
            )),
            create_conversation_usecase: Arc::new(CreateConversationUseCase::new(
                repositories.conversations.clone(),
                membership.clone(),
                presence.clone(),
                rooms.clone(),
                clock.clone(),
            )),
            room_subscription_usecase: Arc::new(RoomSubscriptionUseCase::new(
                membership.clone(),
                rooms.clone(),
            )),
            manage_group_usecase: Arc::new(ManageGroupUseCase::new(
                repositories.conversations.clone(),
                membership,
                presence.clone(),
                rooms,
                clock.clone(),
            )),
            manage_notifications_usecase: Arc::new(ManageNotificationsUseCase::new(
                repositories.notifications,
            )),
            query_presence_usecase: Arc::new(QueryPresenceUseCase::new(
                repositories.users,
                presence,
            )),
            clock,
        }
    }
}
