//! Room Router
//!
//! 接続ごとの購読ルーム（= 会話）を管理し、ルーム内の全接続にイベントを配信します。
//! 配信先はロック中にコピーし、ロックを解放してから送信します。

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tokio::sync::Mutex;

use crate::domain::{ConnectionId, ConversationId, MessagePusher, ServerEvent};

#[derive(Default)]
struct RoomTables {
    /// ルーム → 購読中の接続
    rooms: HashMap<ConversationId, HashSet<ConnectionId>>,
    /// 接続 → 購読中のルーム
    joined: HashMap<ConnectionId, HashSet<ConversationId>>,
}

impl RoomTables {
    fn join(&mut self, connection_id: &ConnectionId, room_id: &ConversationId) {
        self.rooms
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id.clone());
        self.joined
            .entry(connection_id.clone())
            .or_default()
            .insert(room_id.clone());
    }

    fn leave(&mut self, connection_id: &ConnectionId, room_id: &ConversationId) {
        if let Some(members) = self.rooms.get_mut(room_id) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(room_id);
            }
        }
        if let Some(rooms) = self.joined.get_mut(connection_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.joined.remove(connection_id);
            }
        }
    }
}

pub struct RoomRouter {
    message_pusher: Arc<dyn MessagePusher>,
    tables: Mutex<RoomTables>,
}

impl RoomRouter {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            message_pusher,
            tables: Mutex::new(RoomTables::default()),
        }
    }

    pub async fn join(&self, connection_id: &ConnectionId, room_id: &ConversationId) {
        self.tables.lock().await.join(connection_id, room_id);
        tracing::debug!("Connection '{}' joined room '{}'", connection_id, room_id);
    }

    /// 複数の接続をまとめてルームに参加させる
    pub async fn join_all(&self, connection_ids: &[ConnectionId], room_id: &ConversationId) {
        let mut tables = self.tables.lock().await;
        for connection_id in connection_ids {
            tables.join(connection_id, room_id);
        }
    }

    pub async fn leave(&self, connection_id: &ConnectionId, room_id: &ConversationId) {
        self.tables.lock().await.leave(connection_id, room_id);
        tracing::debug!("Connection '{}' left room '{}'", connection_id, room_id);
    }

    pub async fn leave_all_of(&self, connection_ids: &[ConnectionId], room_id: &ConversationId) {
        let mut tables = self.tables.lock().await;
        for connection_id in connection_ids {
            tables.leave(connection_id, room_id);
        }
    }

    /// 接続が購読している全てのルームから退出する（切断時）
    pub async fn leave_all(&self, connection_id: &ConnectionId) -> Vec<ConversationId> {
        let mut tables = self.tables.lock().await;
        let rooms: Vec<ConversationId> = tables
            .joined
            .get(connection_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        for room_id in &rooms {
            tables.leave(connection_id, room_id);
        }
        rooms
    }

    pub async fn members_of(&self, room_id: &ConversationId) -> Vec<ConnectionId> {
        self.tables
            .lock()
            .await
            .rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn rooms_of(&self, connection_id: &ConnectionId) -> HashSet<ConversationId> {
        self.tables
            .lock()
            .await
            .joined
            .get(connection_id)
            .cloned()
            .unwrap_or_default()
    }

    /// ルーム内の全接続に配信する（`exclude` を指定した場合はその接続を除く）
    pub async fn broadcast(
        &self,
        room_id: &ConversationId,
        event: &ServerEvent,
        exclude: Option<&ConnectionId>,
    ) {
        let targets: Vec<ConnectionId> = self
            .members_of(room_id)
            .await
            .into_iter()
            .filter(|connection_id| Some(connection_id) != exclude)
            .collect();
        tracing::debug!(
            "Broadcasting '{}' to {} connection(s) in room '{}'",
            event.name(),
            targets.len(),
            room_id
        );
        self.send_to(targets, event).await;
    }

    /// ルームを経由せず、指定した接続に直接配信する
    pub async fn send_to(&self, connection_ids: Vec<ConnectionId>, event: &ServerEvent) {
        if connection_ids.is_empty() {
            return;
        }
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize '{}' event: {}", event.name(), e);
                return;
            }
        };
        if let Err(e) = self.message_pusher.broadcast(connection_ids, &json).await {
            tracing::warn!("Failed to deliver '{}' event: {}", event.name(), e);
        }
    }

    pub async fn send_to_one(&self, connection_id: &ConnectionId, event: &ServerEvent) {
        self.send_to(vec![connection_id.clone()], event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::message_pusher::WebSocketMessagePusher;
    use tokio::sync::mpsc;

    fn room(id: &str) -> ConversationId {
        ConversationId::new(id.to_string()).unwrap()
    }

    fn error_event(message: &str) -> ServerEvent {
        ServerEvent::Error {
            message: message.to_string(),
        }
    }

    async fn connect(
        pusher: &WebSocketMessagePusher,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        pusher.register_connection(connection_id.clone(), tx).await;
        (connection_id, rx)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        // テスト項目: ルーム内の全接続にイベントが届き、ルーム外には届かない
        // given (前提条件):
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let router = RoomRouter::new(pusher.clone());
        let (c1, mut rx1) = connect(&pusher).await;
        let (c2, mut rx2) = connect(&pusher).await;
        let (outsider, mut rx3) = connect(&pusher).await;
        router.join(&c1, &room("r1")).await;
        router.join(&c2, &room("r1")).await;
        router.join(&outsider, &room("r2")).await;

        // when (操作):
        router.broadcast(&room("r1"), &error_event("hi"), None).await;

        // then (期待する結果):
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender_connection() {
        // テスト項目: exclude を指定した接続には配信されない
        // given (前提条件):
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let router = RoomRouter::new(pusher.clone());
        let (sender, mut sender_rx) = connect(&pusher).await;
        let (other, mut other_rx) = connect(&pusher).await;
        router.join_all(&[sender.clone(), other.clone()], &room("r1")).await;

        // when (操作):
        router
            .broadcast(&room("r1"), &error_event("typing"), Some(&sender))
            .await;

        // then (期待する結果):
        assert!(sender_rx.try_recv().is_err());
        assert!(other_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_leave_all_removes_connection_from_every_room() {
        // テスト項目: 切断時に全ルームから退出し、空のルームは削除される
        // given (前提条件):
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let router = RoomRouter::new(pusher.clone());
        let (c1, _rx1) = connect(&pusher).await;
        router.join(&c1, &room("r1")).await;
        router.join(&c1, &room("r2")).await;

        // when (操作):
        let mut left = router.leave_all(&c1).await;
        left.sort();

        // then (期待する結果):
        assert_eq!(left, vec![room("r1"), room("r2")]);
        assert!(router.members_of(&room("r1")).await.is_empty());
        assert!(router.rooms_of(&c1).await.is_empty());
    }

    #[tokio::test]
    async fn test_dead_connection_does_not_block_others() {
        // テスト項目: 受信側が閉じた接続があっても他の接続への配信は継続される
        // given (前提条件):
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let router = RoomRouter::new(pusher.clone());
        let (dead, dead_rx) = connect(&pusher).await;
        let (alive, mut alive_rx) = connect(&pusher).await;
        drop(dead_rx);
        router.join_all(&[dead, alive], &room("r1")).await;

        // when (操作):
        router.broadcast(&room("r1"), &error_event("hello"), None).await;

        // then (期待する結果):
        let received = alive_rx.try_recv().unwrap();
        assert!(received.contains("hello"));
    }
}
