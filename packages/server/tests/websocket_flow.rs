//! End-to-end tests: a real server on an ephemeral port, driven over WebSocket and HTTP.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, client::IntoClientRequest},
};
use tsudoi_server::{
    domain::{Repositories, UserId, VerifiedIdentity},
    infrastructure::{identity::StaticTokenVerifier, repository::InMemoryDirectory},
    ui::{AppState, Server},
};
use tsudoi_shared::time::SystemClock;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

fn identity(user_id: &str, display_name: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        user_id: UserId::new(user_id.to_string()).unwrap(),
        display_name: display_name.to_string(),
    }
}

/// Start a server with tokens `t-alice` and `t-bob` and return its address
async fn start_server() -> SocketAddr {
    let verifier = StaticTokenVerifier::from_entries([
        ("t-alice".to_string(), identity("alice", "Alice")),
        ("t-bob".to_string(), identity("bob", "Bob")),
    ]);
    let state = AppState::new(
        Repositories::from_store(Arc::new(InMemoryDirectory::new())),
        Arc::new(verifier),
        Arc::new(SystemClock),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(Arc::new(state));
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

async fn connect(addr: SocketAddr, token: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws?token={}", addr, token))
        .await
        .unwrap();
    client
}

async fn send(client: &mut Client, frame: Value) {
    client
        .send(tungstenite::Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Wait for the next event named `name`, skipping others
async fn next_event(client: &mut Client, name: &str) -> Value {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let message = client.next().await.unwrap().unwrap();
            if let tungstenite::Message::Text(text) = message {
                let event: Value = serde_json::from_str(text.as_str()).unwrap();
                if event["event"] == name {
                    return event;
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for '{}'", name))
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: /api/health が {"status": "ok"} を返す
    // given (前提条件):
    let addr = start_server().await;

    // when (操作):
    let response = reqwest::get(format!("http://{}/api/health", addr))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_handshake_without_valid_token_is_rejected() {
    // テスト項目: トークンなし・不正なトークンのハンドシェイクは 401 で拒否される
    // given (前提条件):
    let addr = start_server().await;

    // when (操作):
    let missing = connect_async(format!("ws://{}/ws", addr)).await;
    let forged = connect_async(format!("ws://{}/ws?token=forged", addr)).await;

    // then (期待する結果):
    for result in [missing, forged] {
        match result {
            Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
            other => panic!("expected 401, got {:?}", other.map(|_| ())),
        }
    }
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    // テスト項目: Authorization: Bearer ヘッダーでも接続できる
    // given (前提条件):
    let addr = start_server().await;
    let mut request = format!("ws://{}/ws", addr).into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Authorization", "Bearer t-bob".parse().unwrap());

    // when (操作):
    let (mut bob, _) = connect_async(request).await.unwrap();
    send(&mut bob, json!({"event": "users:online:request"})).await;

    // then (期待する結果):
    let online = next_event(&mut bob, "users:online:list").await;
    assert_eq!(online["data"]["userIds"], json!(["bob"]));
}

#[tokio::test]
async fn test_presence_transitions_are_broadcast() {
    // テスト項目: 他ユーザーのオンライン・オフラインへの遷移が user:status で届き、/debug/presence に反映される
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = connect(addr, "t-alice").await;
    send(&mut alice, json!({"event": "users:online:request"})).await;
    next_event(&mut alice, "users:online:list").await;

    // when (操作):
    let mut bob = connect(addr, "t-bob").await;
    let online = next_event(&mut alice, "user:status").await;
    let snapshot: Value = reqwest::get(format!("http://{}/debug/presence", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    bob.close(None).await.unwrap();
    let offline = next_event(&mut alice, "user:status").await;

    // then (期待する結果):
    assert_eq!(online["data"]["userId"], "bob");
    assert_eq!(online["data"]["isOnline"], true);
    assert_eq!(snapshot["totalConnections"], 2);
    assert_eq!(snapshot["onlineUsers"][0]["userId"], "alice");
    assert_eq!(offline["data"]["userId"], "bob");
    assert_eq!(offline["data"]["isOnline"], false);
    assert!(offline["data"]["lastSeen"].is_number());
}

#[tokio::test]
async fn test_direct_conversation_flow() {
    // テスト項目: ダイレクト会話の作成・送信・既読がソケット越しに届く
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = connect(addr, "t-alice").await;
    send(&mut alice, json!({"event": "users:online:request"})).await;
    next_event(&mut alice, "users:online:list").await;
    let mut bob = connect(addr, "t-bob").await;
    next_event(&mut alice, "user:status").await;

    // when (操作):
    send(
        &mut alice,
        json!({
            "event": "conversation:create",
            "data": {"type": "direct", "participantIds": ["bob"]}
        }),
    )
    .await;
    let created = next_event(&mut alice, "conversation:new").await;
    let conversation_id = created["data"]["conversation"]["id"].clone();
    let bob_created = next_event(&mut bob, "conversation:new").await;

    send(
        &mut alice,
        json!({
            "event": "message:send",
            "data": {"conversationId": conversation_id, "content": "hello bob"}
        }),
    )
    .await;
    let received = next_event(&mut bob, "message:new").await;
    let notification = next_event(&mut bob, "notification:new").await;

    send(
        &mut bob,
        json!({"event": "messages:read", "data": {"conversationId": conversation_id}}),
    )
    .await;
    let seen = next_event(&mut alice, "messages:seen").await;

    // then (期待する結果):
    assert_eq!(bob_created["data"]["conversation"]["id"], conversation_id);
    assert_eq!(received["data"]["message"]["content"], "hello bob");
    assert_eq!(received["data"]["message"]["senderId"], "alice");
    assert_eq!(notification["data"]["notification"]["title"], "Alice");
    assert_eq!(seen["data"]["userId"], "bob");
    assert_eq!(
        seen["data"]["messageIds"],
        json!([received["data"]["message"]["id"]])
    );
}

#[tokio::test]
async fn test_malformed_frame_keeps_session_open() {
    // テスト項目: 不正なフレームには error が返り、接続は維持される
    // given (前提条件):
    let addr = start_server().await;
    let mut alice = connect(addr, "t-alice").await;

    // when (操作):
    alice
        .send(tungstenite::Message::Text("{not json".into()))
        .await
        .unwrap();
    let error = next_event(&mut alice, "error").await;
    send(&mut alice, json!({"event": "users:online:request"})).await;

    // then (期待する結果):
    assert_eq!(error["data"]["message"], "Invalid event");
    let online = next_event(&mut alice, "users:online:list").await;
    assert_eq!(online["data"]["userIds"], json!(["alice"]));
}
