//! Integration tests for the chat page, history endpoint and socket relay.

use std::time::Duration;

use brewhouse_integration_tests::{ADMIN_ID, TestApp, USER_ID, location};
use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn open_socket(app: &TestApp, path: &str) -> Socket {
    let url = app.url(path).replacen("http://", "ws://", 1);
    let mut request = url.into_client_request().unwrap();
    request
        .headers_mut()
        .insert("cookie", app.cookie_header().unwrap());
    let (socket, _) = connect_async(request).await.unwrap();
    socket
}

/// Read frames until one carries `event`.
async fn next_event(socket: &mut Socket, event: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let frame = socket.next().await.unwrap().unwrap();
            if let Message::Text(text) = frame {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                if value["event"] == event {
                    return value;
                }
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_chat_page_points_browser_at_relay() {
    let app = TestApp::spawn().await;
    app.login().await;

    let body = app.get("/chat").await.text().await.unwrap();
    assert!(body.contains("data-role=\"user\""));
    assert!(body.contains("data-socket-path=\"/chat/ws\""));
    assert!(body.contains(&format!("data-participant=\"{USER_ID}\"")));
}

#[tokio::test]
async fn test_conversation_history() {
    let app = TestApp::spawn().await;
    app.login().await;

    let response = app.get("/chat/conversation").await;
    assert_eq!(response.status(), StatusCode::OK);
    let conversation: Value = response.json().await.unwrap();
    assert_eq!(conversation["id"], "c1");
    assert_eq!(conversation["user_id"], USER_ID);
    assert_eq!(conversation["messages"][0]["sender_role"], "admin");
}

#[tokio::test]
async fn test_rejected_token_on_history_is_401() {
    let app = TestApp::spawn().await;
    app.login().await;
    app.backend.revoke_tokens();

    let response = app.get("/chat/conversation").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(location(&app.get("/chat").await), "/auth/login");
}

#[tokio::test]
async fn test_socket_requires_login() {
    let app = TestApp::spawn().await;
    app.get("/").await;

    let url = app.url("/chat/ws").replacen("http://", "ws://", 1);
    let mut request = url.into_client_request().unwrap();
    if let Some(cookie) = app.cookie_header() {
        request.headers_mut().insert("cookie", cookie);
    }
    assert!(connect_async(request).await.is_err());
}

#[tokio::test]
async fn test_relay_joins_and_stamps_sender() {
    let app = TestApp::spawn().await;
    app.login().await;

    let mut socket = open_socket(&app, "/chat/ws").await;
    let presence = next_event(&mut socket, "presence").await;
    assert_eq!(presence["data"]["user_id"], ADMIN_ID);
    assert_eq!(presence["data"]["online"], true);

    let joins = app.backend.recorded(|r| r.joins.clone()).await;
    assert_eq!(joins, [json!({ "id": USER_ID, "role": "user" })]);

    let frame = json!({
        "event": "send_message",
        "data": { "conversation_id": "c1", "text": "  Halo  " }
    });
    socket
        .send(Message::text(frame.to_string()))
        .await
        .unwrap();

    let received = next_event(&mut socket, "receive_message").await;
    assert_eq!(received["data"]["text"], "Halo");
    assert_eq!(received["data"]["sender_id"], USER_ID);
    assert_eq!(received["data"]["sender_role"], "user");
    assert_eq!(received["data"]["conversation_id"], "c1");
}

#[tokio::test]
async fn test_admin_relay_joins_as_admin() {
    let app = TestApp::spawn().await;
    app.admin_login().await;

    let body = app.get("/chat?as=admin&id=c1").await.text().await.unwrap();
    assert!(body.contains("data-role=\"admin\""));

    let mut socket = open_socket(&app, "/chat/ws?as=admin").await;
    next_event(&mut socket, "presence").await;

    let joins = app.backend.recorded(|r| r.joins.clone()).await;
    assert_eq!(joins, [json!({ "id": ADMIN_ID, "role": "admin" })]);

    let conversation: Value = app
        .get("/chat/conversation?as=admin&id=c1")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(conversation["id"], "c1");

    let missing = app.get("/chat/conversation?as=admin").await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}
