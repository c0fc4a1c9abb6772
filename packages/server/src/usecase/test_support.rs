//! UseCase テスト用の共通セットアップ

use std::sync::Arc;

use tokio::sync::mpsc;
use tsudoi_shared::time::{Clock, FixedClock};

use crate::{
    domain::{
        Conversation, ConversationId, ConnectionId, ConversationRepository, GroupProfile,
        MembershipIndex, MessagePusher, PresenceRegistry, Repositories, RoomRouter, Timestamp,
        UserId, UserRepository,
    },
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryDirectory},
};

pub const NOW: i64 = 1_700_000_000_000;

pub fn user(id: &str) -> UserId {
    UserId::new(id.to_string()).unwrap()
}

/// 1 つのサーバー分の状態（テストごとに新しく作る）
pub struct Fixture {
    pub directory: Arc<InMemoryDirectory>,
    pub repositories: Repositories,
    pub pusher: Arc<WebSocketMessagePusher>,
    pub presence: Arc<PresenceRegistry>,
    pub rooms: Arc<RoomRouter>,
    pub membership: Arc<MembershipIndex>,
    pub clock: Arc<dyn Clock>,
}

pub struct TestConnection {
    pub connection_id: ConnectionId,
    pub rx: mpsc::UnboundedReceiver<String>,
}

impl TestConnection {
    /// 受信済みのイベントを全て取り出す
    pub fn drain(&mut self) -> Vec<serde_json::Value> {
        let mut events = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            events.push(serde_json::from_str(&text).unwrap());
        }
        events
    }

    /// 受信済みのイベント名を全て取り出す
    pub fn drain_names(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|event| event["event"].as_str().unwrap().to_string())
            .collect()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_overrides(|repositories| repositories)
    }

    /// 一部の Repository を差し替える（失敗系のテスト用）
    pub fn with_overrides(overrides: impl FnOnce(Repositories) -> Repositories) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let repositories = overrides(Repositories::from_store(directory.clone()));
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let membership = Arc::new(MembershipIndex::new(repositories.conversations.clone()));
        Self {
            directory,
            repositories,
            rooms: Arc::new(RoomRouter::new(pusher.clone())),
            pusher,
            presence: Arc::new(PresenceRegistry::new()),
            membership,
            clock: Arc::new(FixedClock::new(NOW)),
        }
    }

    /// 接続を登録し、保存済みの会話のルームに参加させる
    pub async fn connect(&self, user_id: &str) -> TestConnection {
        let user_id = user(user_id);
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        self.pusher
            .register_connection(connection_id.clone(), tx)
            .await;
        self.presence.register(&user_id, &connection_id).await;
        self.directory
            .ensure_user(&user_id, &display_name(user_id.as_str()))
            .await
            .unwrap();
        for conversation in self
            .directory
            .list_conversations_for(&user_id)
            .await
            .unwrap()
        {
            self.rooms.join(&connection_id, &conversation.id).await;
        }
        TestConnection { connection_id, rx }
    }

    pub async fn seed_user(&self, user_id: &str) {
        self.directory
            .ensure_user(&user(user_id), &display_name(user_id))
            .await
            .unwrap();
    }

    pub async fn seed_group(&self, creator: &str, members: &[&str], name: Option<&str>) -> ConversationId {
        let conversation = Conversation::group(
            ConversationId::generate(),
            user(creator),
            members.iter().map(|m| user(m)),
            GroupProfile {
                name: name.map(str::to_string),
                ..GroupProfile::default()
            },
            Timestamp::new(NOW - 1000),
        )
        .unwrap();
        self.directory.create_group(conversation).await.unwrap().id
    }

    pub async fn seed_direct(&self, a: &str, b: &str) -> ConversationId {
        let conversation = Conversation::direct(
            ConversationId::generate(),
            user(a),
            user(b),
            Timestamp::new(NOW - 1000),
        )
        .unwrap();
        self.directory
            .find_or_create_direct(conversation)
            .await
            .unwrap()
            .0
            .id
    }
}

/// "alice" → "Alice"
pub fn display_name(user_id: &str) -> String {
    let mut chars = user_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
