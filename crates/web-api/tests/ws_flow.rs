mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use support::spawn_app;

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect_ws(addr: &str) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("websocket connect");
    ws
}

async fn send_event(ws: &mut WsClient, event: Value) {
    ws.send(Message::Text(event.to_string().into()))
        .await
        .expect("send frame");
}

/// Reads frames until one with the given event name arrives.
async fn wait_for(ws: &mut WsClient, event: &str) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {event}"))
            .expect("stream ended")
            .expect("frame error");
        if let Message::Text(text) = frame {
            let value: Value = serde_json::from_str(&text).expect("invalid json");
            if value["event"] == event {
                return value;
            }
        }
    }
}

#[tokio::test]
async fn join_presence_and_broadcast_flow() {
    let addr = spawn_app().await;

    // First guest joins and gets the (empty) history replay.
    let mut xavier = connect_ws(&addr).await;
    send_event(
        &mut xavier,
        json!({"event": "user_join", "data": {"username": "xavier", "room": "general"}}),
    )
    .await;
    let replay = wait_for(&mut xavier, "room_messages").await;
    assert_eq!(replay["data"]["messages"].as_array().unwrap().len(), 0);
    wait_for(&mut xavier, "user_joined").await;

    // Second guest joins the same room.
    let mut yvonne = connect_ws(&addr).await;
    send_event(
        &mut yvonne,
        json!({"event": "user_join", "data": {"username": "yvonne", "room": "general"}}),
    )
    .await;

    // The resident sees the refreshed roster and then the arrival notice.
    let roster = wait_for(&mut xavier, "user_list").await;
    let names: Vec<&str> = roster["data"]["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"xavier"));
    assert!(names.contains(&"yvonne"));
    let joined = wait_for(&mut xavier, "user_joined").await;
    assert_eq!(joined["data"]["username"], "yvonne");

    // A public message reaches both, and the sender gets an ack.
    send_event(
        &mut yvonne,
        json!({"event": "send_message", "data": {"content": "hello"}}),
    )
    .await;
    let received = wait_for(&mut xavier, "receive_message").await;
    assert_eq!(received["data"]["message"]["content"], "hello");
    let received = wait_for(&mut yvonne, "receive_message").await;
    assert_eq!(received["data"]["message"]["content"], "hello");
    wait_for(&mut yvonne, "message_sent").await;

    // A later joiner replays the message it missed.
    let mut zack = connect_ws(&addr).await;
    send_event(
        &mut zack,
        json!({"event": "user_join", "data": {"username": "zack", "room": "general"}}),
    )
    .await;
    let replay = wait_for(&mut zack, "room_messages").await;
    let messages = replay["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "hello");
}

#[tokio::test]
async fn disconnect_is_announced_to_the_room() {
    let addr = spawn_app().await;

    let mut alice = connect_ws(&addr).await;
    send_event(
        &mut alice,
        json!({"event": "user_join", "data": {"username": "alice", "room": "general"}}),
    )
    .await;
    wait_for(&mut alice, "user_joined").await;

    let mut bob = connect_ws(&addr).await;
    send_event(
        &mut bob,
        json!({"event": "user_join", "data": {"username": "bob", "room": "general"}}),
    )
    .await;
    wait_for(&mut alice, "user_joined").await;

    bob.close(None).await.expect("close");

    let left = wait_for(&mut alice, "user_left").await;
    assert_eq!(left["data"]["username"], "bob");
    let roster = wait_for(&mut alice, "user_list").await;
    let users = roster["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
}

#[tokio::test]
async fn registered_user_joins_with_a_token() {
    let addr = spawn_app().await;
    let client = reqwest::Client::new();

    let registered: Value = client
        .post(format!("http://{addr}/api/auth/register"))
        .json(&json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "secret"
        }))
        .send()
        .await
        .expect("register")
        .json()
        .await
        .expect("register json");
    let token = registered["token"].as_str().expect("token");

    let mut carol = connect_ws(&addr).await;
    send_event(
        &mut carol,
        json!({"event": "user_join", "data": {"token": token, "room": "general"}}),
    )
    .await;

    let roster = wait_for(&mut carol, "user_list").await;
    let users = roster["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "carol");
    assert_eq!(users[0]["is_guest"], false);

    // A bogus token is answered with an error event, not a disconnect.
    let mut mallory = connect_ws(&addr).await;
    send_event(
        &mut mallory,
        json!({"event": "user_join", "data": {"token": "not-a-jwt"}}),
    )
    .await;
    wait_for(&mut mallory, "error").await;
}
