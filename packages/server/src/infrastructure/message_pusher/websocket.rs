//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続 ID ごとの `UnboundedSender` を管理
//! - クライアントへのメッセージ送信（push_to, broadcast）
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された sender を受け取り、送信だけを担当します。
//! 実際のソケット書き込みは接続ごとの pusher ループが行うため、
//! ここでの送信はチャンネルへの投入だけでブロックしません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// Key: 接続 ID, Value: その接続の送信チャンネル
    connections: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録中の接続数
    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_connection(&self, connection_id: ConnectionId, sender: PusherChannel) {
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        self.connections.lock().await.insert(connection_id, sender);
    }

    async fn unregister_connection(&self, connection_id: &ConnectionId) {
        self.connections.lock().await.remove(connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let connections = self.connections.lock().await;

        let Some(sender) = connections.get(connection_id) else {
            return Err(MessagePushError::ConnectionNotFound(
                connection_id.to_string(),
            ));
        };
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::trace!("Pushed message to connection '{}'", connection_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        content: &str,
    ) -> Result<(), MessagePushError> {
        // 送信先のチャンネルだけをコピーしてロックを解放する
        let senders: Vec<(ConnectionId, PusherChannel)> = {
            let connections = self.connections.lock().await;
            targets
                .into_iter()
                .filter_map(|target| match connections.get(&target) {
                    Some(sender) => Some((target, sender.clone())),
                    None => {
                        tracing::debug!(
                            "Connection '{}' not found during broadcast, skipping",
                            target
                        );
                        None
                    }
                })
                .collect()
        };

        for (target, sender) in senders {
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = sender.send(content.to_string()) {
                tracing::warn!("Failed to push message to connection '{}': {}", target, e);
            }
        }

        Ok(())
    }
}
