//! End-to-end relay behaviour through a live proxy.

mod common;

use std::collections::HashMap;

use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::Message;

use common::{
    next_data, next_event, next_text, start_echo_backend, start_proxy, start_scripted_backend,
    unused_addr, Action, BackendEvent,
};

#[tokio::test]
async fn relays_messages_in_order_both_ways() {
    let (backend, mut events) = start_scripted_backend(|text| {
        Action::Reply(text.replacen("ping", "pong", 1))
    })
    .await;
    let proxy = start_proxy(backend, |_| {}).await;

    let mut client = proxy.connect().await;
    assert_eq!(next_event(&mut events).await, BackendEvent::Connected(1));

    client.send(Message::text("ping1")).await.unwrap();
    client.send(Message::text("ping2")).await.unwrap();

    assert_eq!(next_event(&mut events).await, BackendEvent::Message(1, "ping1".into()));
    assert_eq!(next_event(&mut events).await, BackendEvent::Message(1, "ping2".into()));
    assert_eq!(next_text(&mut client).await.as_deref(), Some("pong1"));
    assert_eq!(next_text(&mut client).await.as_deref(), Some("pong2"));
}

#[tokio::test]
async fn preserves_order_over_a_burst() {
    let (backend, mut events) = start_echo_backend().await;
    let proxy = start_proxy(backend, |_| {}).await;
    let mut client = proxy.connect().await;

    for i in 0..50 {
        client.send(Message::text(format!("msg-{i}"))).await.unwrap();
    }

    assert_eq!(next_event(&mut events).await, BackendEvent::Connected(1));
    for i in 0..50 {
        assert_eq!(next_event(&mut events).await, BackendEvent::Message(1, format!("msg-{i}")));
    }
    for i in 0..50 {
        assert_eq!(next_text(&mut client).await, Some(format!("msg-{i}")));
    }
}

#[tokio::test]
async fn binary_messages_stay_binary() {
    let (backend, _events) = start_echo_backend().await;
    let proxy = start_proxy(backend, |_| {}).await;
    let mut client = proxy.connect().await;

    let payload = vec![0u8, 159, 146, 150, 255];
    client.send(Message::binary(payload.clone())).await.unwrap();

    match next_data(&mut client).await {
        Some(Message::Binary(data)) => assert_eq!(data.to_vec(), payload),
        other => panic!("expected binary echo, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_sessions_are_isolated() {
    let (backend, mut events) = start_echo_backend().await;
    let proxy = start_proxy(backend, |_| {}).await;

    let mut a = proxy.connect().await;
    let mut b = proxy.connect().await;

    a.send(Message::text("a-1")).await.unwrap();
    b.send(Message::text("b-1")).await.unwrap();
    a.send(Message::text("a-2")).await.unwrap();
    b.send(Message::text("b-2")).await.unwrap();

    assert_eq!(next_text(&mut a).await.as_deref(), Some("a-1"));
    assert_eq!(next_text(&mut a).await.as_deref(), Some("a-2"));
    assert_eq!(next_text(&mut b).await.as_deref(), Some("b-1"));
    assert_eq!(next_text(&mut b).await.as_deref(), Some("b-2"));

    // Each backend connection saw traffic from exactly one client.
    let mut by_connection: HashMap<usize, Vec<String>> = HashMap::new();
    while by_connection.values().map(Vec::len).sum::<usize>() < 4 {
        if let BackendEvent::Message(id, text) = next_event(&mut events).await {
            by_connection.entry(id).or_default().push(text);
        }
    }
    assert_eq!(by_connection.len(), 2);
    for messages in by_connection.values() {
        let prefix = &messages[0][..2];
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.starts_with(prefix)), "mixed traffic: {messages:?}");
    }
    assert_eq!(proxy.sessions.active_count(), 2);
}

#[tokio::test]
async fn backend_close_tears_down_client() {
    let (backend, mut events) = start_scripted_backend(|text| match text {
        "bye" => Action::Close,
        other => Action::Reply(other.to_string()),
    })
    .await;
    let proxy = start_proxy(backend, |_| {}).await;
    let mut client = proxy.connect().await;

    client.send(Message::text("hello")).await.unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("hello"));

    client.send(Message::text("bye")).await.unwrap();
    assert_eq!(next_text(&mut client).await, None);

    assert_eq!(next_event(&mut events).await, BackendEvent::Connected(1));
    assert_eq!(next_event(&mut events).await, BackendEvent::Message(1, "hello".into()));
    assert_eq!(next_event(&mut events).await, BackendEvent::Message(1, "bye".into()));
    assert_eq!(next_event(&mut events).await, BackendEvent::Closed(1));

    proxy.wait_for_no_sessions().await;
}

#[tokio::test]
async fn client_disconnect_closes_backend() {
    let (backend, mut events) = start_echo_backend().await;
    let proxy = start_proxy(backend, |_| {}).await;
    let mut client = proxy.connect().await;

    client.send(Message::text("hello")).await.unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("hello"));
    assert_eq!(next_event(&mut events).await, BackendEvent::Connected(1));
    assert_eq!(next_event(&mut events).await, BackendEvent::Message(1, "hello".into()));

    // Abrupt: no close frame, just the socket going away.
    drop(client);

    assert_eq!(next_event(&mut events).await, BackendEvent::Closed(1));
    proxy.wait_for_no_sessions().await;
}

#[tokio::test]
async fn unreachable_backend_closes_client() {
    let proxy = start_proxy(unused_addr().await, |config| {
        config.backend.connect_timeout_secs = 2;
    })
    .await;

    let mut client = proxy.connect().await;
    assert_eq!(next_text(&mut client).await, None);
    proxy.wait_for_no_sessions().await;
}

#[tokio::test]
async fn plain_request_gets_envelope_and_no_backend_connection() {
    let (backend, mut events) = start_echo_backend().await;
    let proxy = start_proxy(backend, |_| {}).await;

    let response = reqwest::get(proxy.http_url()).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"RetCode": -1, "RetMsg": "not websocket request"}));

    assert!(events.try_recv().is_err());
    assert_eq!(proxy.sessions.active_count(), 0);
}

#[tokio::test]
async fn session_limit_rejects_extra_upgrades() {
    let (backend, mut events) = start_echo_backend().await;
    let proxy = start_proxy(backend, |config| {
        config.listener.max_sessions = 1;
    })
    .await;

    let mut first = proxy.connect().await;
    assert_eq!(next_event(&mut events).await, BackendEvent::Connected(1));

    let second = tokio_tungstenite::connect_async(proxy.ws_url()).await;
    assert!(second.is_err(), "second upgrade should be refused");

    first.send(Message::text("still-served")).await.unwrap();
    assert_eq!(next_text(&mut first).await.as_deref(), Some("still-served"));
}

#[tokio::test]
async fn any_path_is_relayed_or_answered() {
    let (backend, mut events) = start_echo_backend().await;
    let proxy = start_proxy(backend, |_| {}).await;

    let response = reqwest::get(format!("http://{}/some/deep/path", proxy.addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"RetCode": -1, "RetMsg": "not websocket request"}));

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/feed", proxy.addr))
        .await
        .unwrap();
    assert_eq!(next_event(&mut events).await, BackendEvent::Connected(1));

    client.send(Message::text("hello")).await.unwrap();
    assert_eq!(next_text(&mut client).await.as_deref(), Some("hello"));
}
