//! End-to-end signaling over real sockets: peers negotiate through the relay
//! exactly the way the browser clients do.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parley_common::config::HubConfig;
use parley_hub::SignalHub;
use parley_server::{AppState, build_router};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> String {
    let hub = SignalHub::new(HubConfig::default());
    let router = build_router(AppState {
        hub,
        outbound_queue: 64,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("ws://{addr}/comm")
}

async fn connect(url: &str) -> Socket {
    let (socket, _) = connect_async(url).await.unwrap();
    socket
}

async fn send_text(socket: &mut Socket, text: String) {
    socket.send(Message::Text(text.into())).await.unwrap();
}

async fn recv_text(socket: &mut Socket) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed unexpectedly")
            .unwrap();
        if let Message::Text(text) = msg {
            return text.to_string();
        }
    }
}

async fn recv_json(socket: &mut Socket) -> Value {
    serde_json::from_str(&recv_text(socket).await).unwrap()
}

/// Let the server drain one socket's frames before the next actor moves,
/// so join order is deterministic.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn two_party_call_setup_relay_and_teardown() {
    let url = spawn_server().await;

    let mut alice = connect(&url).await;
    send_text(
        &mut alice,
        json!({"action": "subscribe", "room": "r1", "isOwner": true}).to_string(),
    )
    .await;
    settle().await;

    let mut bob = connect(&url).await;
    send_text(
        &mut bob,
        json!({"action": "subscribe", "room": "r1", "isOwner": false}).to_string(),
    )
    .await;

    // alice, the earlier joiner, is told about bob and then told to call
    let new_sub = recv_json(&mut alice).await;
    assert_eq!(new_sub["action"], "newSub");
    assert_eq!(new_sub["room"], "r1");
    let start_call = recv_json(&mut alice).await;
    assert_eq!(start_call["action"], "startCall");
    assert_eq!(start_call["room"], "r1");
    assert_eq!(start_call["isCaller"], true);

    // bob only learns the room was occupied
    let echo = recv_json(&mut bob).await;
    assert_eq!(echo["action"], "newSub");

    // opaque payloads cross the relay byte-for-byte
    let offer = json!({"action": "sdp", "sdp": "v=0 mock-offer", "room": "r1"}).to_string();
    send_text(&mut alice, offer.clone()).await;
    assert_eq!(recv_text(&mut bob).await, offer);

    let online = json!({"action": "imOnline", "room": "r1"}).to_string();
    send_text(&mut bob, online.clone()).await;
    assert_eq!(recv_text(&mut alice).await, online);

    // a third subscriber bounces off the full room
    let mut eve = connect(&url).await;
    send_text(
        &mut eve,
        json!({"action": "subscribe", "room": "r1", "isOwner": true}).to_string(),
    )
    .await;
    let rejected = recv_json(&mut eve).await;
    assert_eq!(rejected["action"], "subRejected");
    assert_eq!(
        rejected["reason"],
        "Only two users allowed in room. Communication disallowed."
    );

    // hanging up the socket is an implicit unsubscribe
    bob.close(None).await.unwrap();
    let offline = recv_json(&mut alice).await;
    assert_eq!(offline["action"], "imOffline");
    assert_eq!(offline["room"], "r1");
}

#[tokio::test]
async fn role_conflict_is_rejected_then_retry_succeeds() {
    let url = spawn_server().await;

    let mut alice = connect(&url).await;
    send_text(
        &mut alice,
        json!({"action": "subscribe", "room": "den", "isOwner": true}).to_string(),
    )
    .await;
    settle().await;

    let mut bob = connect(&url).await;
    send_text(
        &mut bob,
        json!({"action": "subscribe", "room": "den", "isOwner": true}).to_string(),
    )
    .await;
    let rejected = recv_json(&mut bob).await;
    assert_eq!(rejected["action"], "subRejected");
    assert_eq!(rejected["reason"], "Owner already exists in room");

    // retry with the open role slot
    send_text(
        &mut bob,
        json!({"action": "subscribe", "room": "den", "isOwner": false}).to_string(),
    )
    .await;

    assert_eq!(recv_json(&mut alice).await["action"], "newSub");
    assert_eq!(recv_json(&mut alice).await["action"], "startCall");
    assert_eq!(recv_json(&mut bob).await["action"], "newSub");
}

#[tokio::test]
async fn explicit_unsubscribe_notifies_and_frees_the_room() {
    let url = spawn_server().await;

    let mut alice = connect(&url).await;
    send_text(
        &mut alice,
        json!({"action": "subscribe", "room": "attic"}).to_string(),
    )
    .await;
    settle().await;

    let mut bob = connect(&url).await;
    send_text(
        &mut bob,
        json!({"action": "subscribe", "room": "attic", "isOwner": true}).to_string(),
    )
    .await;
    assert_eq!(recv_json(&mut alice).await["action"], "newSub");
    assert_eq!(recv_json(&mut alice).await["action"], "startCall");
    assert_eq!(recv_json(&mut bob).await["action"], "newSub");

    send_text(
        &mut bob,
        json!({"action": "unsubscribe", "room": "attic"}).to_string(),
    )
    .await;
    assert_eq!(recv_json(&mut alice).await["action"], "imOffline");

    // the freed non-owner slot is open again
    let mut carol = connect(&url).await;
    send_text(
        &mut carol,
        json!({"action": "subscribe", "room": "attic", "isOwner": true}).to_string(),
    )
    .await;
    assert_eq!(recv_json(&mut carol).await["action"], "newSub");
    assert_eq!(recv_json(&mut alice).await["action"], "newSub");
    assert_eq!(recv_json(&mut alice).await["action"], "startCall");
}
