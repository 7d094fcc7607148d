use std::time::Duration;

use awc::{error::WsClientError, ws, Client};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};

use super::support::{fixture, start_chat_server, CONSUMER, FARMER};

fn text_json(frame: ws::Frame) -> Value {
    match frame {
        ws::Frame::Text(bytes) => serde_json::from_slice(&bytes).expect("json frame"),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[actix_rt::test]
async fn online_receiver_gets_message_pushed() {
    let fx = fixture().await;
    let (addr, handle) = start_chat_server(fx.state.clone())
        .await
        .expect("start chat server");
    let client = Client::new();

    let (_resp, mut consumer) = client
        .ws(format!("http://{addr}/ws/chat?token={}", fx.consumer_token))
        .connect()
        .await
        .expect("connect websocket client");
    assert!(fx.state.registry.is_online(CONSUMER).await);

    let mut resp = client
        .post(format!("http://{addr}/chat/send"))
        .bearer_auth(&fx.farmer_token)
        .send_json(&json!({
            "receiver_id": CONSUMER,
            "receiver_name": "Priya Sharma",
            "body": "Onions at 30/kg today"
        }))
        .await
        .expect("send message");
    let body: Value = resp.json().await.expect("send response");
    assert_eq!(body["delivered_realtime"], true);

    let frame = text_json(consumer.next().await.expect("frame").expect("frame data"));
    assert_eq!(frame["type"], "new_message");
    assert_eq!(frame["message"]["body"], "Onions at 30/kg today");
    assert_eq!(frame["message"]["sender_id"], FARMER);

    handle.stop(true).await;
}

#[actix_rt::test]
async fn ping_and_unknown_frames() {
    let fx = fixture().await;
    let (addr, handle) = start_chat_server(fx.state.clone())
        .await
        .expect("start chat server");

    let (_resp, mut conn) = Client::new()
        .ws(format!("http://{addr}/ws/chat"))
        .bearer_auth(&fx.farmer_token)
        .connect()
        .await
        .expect("connect websocket client");

    conn.send(ws::Message::Text("not json at all".into())).await.unwrap();
    conn.send(ws::Message::Text(r#"{"type":"subscribe"}"#.into())).await.unwrap();
    conn.send(ws::Message::Text(r#"{"type":"ping"}"#.into())).await.unwrap();

    let frame = text_json(conn.next().await.expect("frame").expect("frame data"));
    assert_eq!(frame, json!({ "type": "pong" }));

    handle.stop(true).await;
}

#[actix_rt::test]
async fn typing_is_relayed_to_receiver() {
    let fx = fixture().await;
    let (addr, handle) = start_chat_server(fx.state.clone())
        .await
        .expect("start chat server");
    let client = Client::new();

    let (_r1, mut farmer) = client
        .ws(format!("http://{addr}/ws/chat?token={}", fx.farmer_token))
        .connect()
        .await
        .expect("connect farmer");
    let (_r2, mut consumer) = client
        .ws(format!("http://{addr}/ws/chat?token={}", fx.consumer_token))
        .connect()
        .await
        .expect("connect consumer");

    let typing = json!({ "type": "typing", "receiver_id": CONSUMER }).to_string();
    farmer.send(ws::Message::Text(typing.into())).await.unwrap();

    let frame = text_json(consumer.next().await.expect("frame").expect("frame data"));
    assert_eq!(frame, json!({ "type": "typing", "sender_id": FARMER }));

    handle.stop(true).await;
}

#[actix_rt::test]
async fn second_login_supersedes_first() {
    let fx = fixture().await;
    let (addr, handle) = start_chat_server(fx.state.clone())
        .await
        .expect("start chat server");
    let client = Client::new();
    let url = format!("http://{addr}/ws/chat?token={}", fx.consumer_token);

    let (_r1, mut first) = client.ws(url.as_str()).connect().await.expect("first login");
    let (_r2, mut second) = client.ws(url.as_str()).connect().await.expect("second login");

    let frame = text_json(first.next().await.expect("frame").expect("frame data"));
    assert_eq!(frame["type"], "superseded");
    match first.next().await {
        Some(Ok(ws::Frame::Close(_))) | None => {}
        other => panic!("expected close, got {other:?}"),
    }

    // the evicted session stopping must leave the new one registered
    actix_rt::time::sleep(Duration::from_millis(100)).await;
    assert!(fx.state.registry.is_online(CONSUMER).await);

    second.send(ws::Message::Text(r#"{"type":"ping"}"#.into())).await.unwrap();
    let frame = text_json(second.next().await.expect("frame").expect("frame data"));
    assert_eq!(frame["type"], "pong");

    second.send(ws::Message::Close(None)).await.unwrap();
    let mut offline = false;
    for _ in 0..40 {
        if !fx.state.registry.is_online(CONSUMER).await {
            offline = true;
            break;
        }
        actix_rt::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(offline, "closed session should deregister");

    handle.stop(true).await;
}

#[actix_rt::test]
async fn upgrade_without_valid_token_is_rejected() {
    let fx = fixture().await;
    let (addr, handle) = start_chat_server(fx.state.clone())
        .await
        .expect("start chat server");
    let client = Client::new();

    for url in [
        format!("http://{addr}/ws/chat"),
        format!("http://{addr}/ws/chat?token=forged"),
    ] {
        match client.ws(url).connect().await {
            Err(WsClientError::InvalidResponseStatus(status)) => assert_eq!(status.as_u16(), 401),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("upgrade should be rejected"),
        }
    }
    assert_eq!(fx.state.registry.online_count().await, 0);

    handle.stop(true).await;
}
