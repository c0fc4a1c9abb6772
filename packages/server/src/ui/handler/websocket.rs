//! WebSocket 接続のハンドラー

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};

use crate::{
    domain::{ConnectionId, ServerEvent, VerifiedIdentity},
    ui::{
        session::{SessionContext, SessionPhase},
        state::AppState,
    },
    usecase::ConnectError,
};

/// WebSocket 接続のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// `Authorization: Bearer <token>` からトークンを取り出す
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Connecting → Authenticated
    let token = bearer_token(&headers).or(query.token);
    let identity = match state
        .connect_session_usecase
        .authenticate(token.as_deref())
        .await
    {
        Ok(identity) => identity,
        Err(ConnectError::Unauthenticated) => {
            tracing::warn!("Rejected WebSocket handshake: missing or invalid credential");
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            tracing::error!("Rejected WebSocket handshake: {}", e);
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    };
    tracing::info!("User '{}' authenticated", identity.user_id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

/// rx チャンネルで受け取ったイベントを WebSocket に送るタスクを起動する
///
/// この接続宛てのイベント（ルームへの配信・オンライン状態の更新・応答）はすべてここを通る。
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: VerifiedIdentity) {
    let (mut sender, mut receiver) = socket.split();
    let mut phase = SessionPhase::Authenticated;

    // Authenticated → Active
    let connection_id = ConnectionId::generate();
    let (tx, rx) = mpsc::unbounded_channel();
    if let Err(e) = state
        .connect_session_usecase
        .execute(&identity, connection_id.clone(), tx.clone())
        .await
    {
        tracing::error!(
            "Failed to activate session of '{}': {}",
            identity.user_id,
            e
        );
        let event = ServerEvent::Error {
            message: "Failed to start session".to_string(),
        };
        if let Ok(json) = event.to_json() {
            let _ = sender.send(Message::Text(json.into())).await;
        }
        let _ = sender.send(Message::Close(None)).await;
        return;
    }
    phase = advance(phase, SessionPhase::Active, &connection_id);

    let session = SessionContext::new(state.clone(), identity.user_id.clone(), connection_id, tx);
    // 処理中のイベント（切断処理はこれが解放されるまで待つ）
    let in_flight = Arc::new(Mutex::new(()));

    // クライアントからのイベントを受信するタスク
    let mut recv_task = {
        let session = session.clone();
        let in_flight = in_flight.clone();
        tokio::spawn(async move {
            while let Some(msg) = receiver.next().await {
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                };

                match msg {
                    Message::Text(text) => {
                        // 1 イベントずつ別タスクで処理し、完了を待ってから次を読む。
                        // ソケットが閉じてもタスクは最後まで実行される。
                        let guard = in_flight.clone().lock_owned().await;
                        let session = session.clone();
                        let handle = tokio::spawn(async move {
                            let _guard = guard;
                            session.handle_text(text.as_str()).await;
                        });
                        if let Err(e) = handle.await {
                            tracing::error!("Event handler task failed: {}", e);
                        }
                    }
                    Message::Ping(_) => {
                        tracing::debug!("Received ping");
                        // Ping/pong is handled automatically by the WebSocket protocol
                    }
                    Message::Close(_) => {
                        tracing::info!(
                            "Connection '{}' requested close",
                            session.connection_id()
                        );
                        break;
                    }
                    _ => {}
                }
            }
        })
    };

    // クライアントへイベントを送るタスク
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Active → Disconnected
    drop(in_flight.lock().await);
    state
        .disconnect_session_usecase
        .execute(session.user_id(), session.connection_id())
        .await;
    advance(phase, SessionPhase::Disconnected, session.connection_id());
}

fn advance(phase: SessionPhase, next: SessionPhase, connection_id: &ConnectionId) -> SessionPhase {
    match phase.advance(next) {
        Some(next) => {
            tracing::debug!("Session '{}': {:?} → {:?}", connection_id, phase, next);
            next
        }
        None => {
            tracing::warn!(
                "Session '{}': unexpected transition {:?} → {:?}",
                connection_id,
                phase,
                next
            );
            phase
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_is_extracted_from_header() {
        // テスト項目: Authorization ヘッダーの Bearer トークンが取り出される
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t-alice"));

        // when (操作):
        let token = bearer_token(&headers);

        // then (期待する結果):
        assert_eq!(token.as_deref(), Some("t-alice"));
    }

    #[test]
    fn test_other_authorization_schemes_are_ignored() {
        // テスト項目: Bearer 以外の Authorization ヘッダーは無視される
        // given (前提条件):
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YWxpY2U6"));

        // when (操作):
        let token = bearer_token(&headers);

        // then (期待する結果):
        assert_eq!(token, None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
