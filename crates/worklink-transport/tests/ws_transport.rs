// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the WebSocket broker transport.
//!
//! Each test runs an in-process tokio-tungstenite server standing in for the
//! broker, so connection lifecycle, dispatch, and reconnect behavior are
//! exercised over real sockets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, accept_hdr_async};

use worklink_config::model::BrokerConfig;
use worklink_core::traits::Transport;
use worklink_core::types::{ChatMessage, ConnectionState};
use worklink_transport::frame::{destinations, BrokerFrame};
use worklink_transport::router::SubscriptionRouter;
use worklink_transport::WsTransport;

fn broker_config(addr: std::net::SocketAddr) -> BrokerConfig {
    BrokerConfig {
        url: format!("ws://{addr}/ws"),
        heartbeat_secs: 1,
        reconnect_delay_ms: 100,
    }
}

fn inbound_message_frame(sender: &str, recipient: &str, content: &str) -> String {
    serde_json::to_string(&BrokerFrame::new(
        destinations::QUEUE_MESSAGES,
        serde_json::json!({
            "senderId": sender,
            "recipientId": recipient,
            "content": content,
            "messageType": "CHAT",
            "timestamp": "2026-03-01T10:00:00Z",
        }),
    ))
    .unwrap()
}

async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, want: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if *rx.borrow_and_update() == want {
                return;
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for state {want}"));
}

/// Handshake carries the user id; inbound frames are dispatched through the
/// router to the registered callback.
#[tokio::test]
async fn connect_subscribes_and_dispatches_inbound_messages() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (path_tx, path_rx) = oneshot::channel::<String>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut path_tx = Some(path_tx);
        let mut ws = accept_hdr_async(stream, move |req: &tokio_tungstenite::tungstenite::handshake::server::Request, resp| {
            if let Some(tx) = path_tx.take() {
                let _ = tx.send(req.uri().to_string());
            }
            Ok(resp)
        })
        .await
        .unwrap();

        ws.send(Message::Text(inbound_message_frame("42", "7", "hi").into()))
            .await
            .unwrap();

        // Keep the socket alive so heartbeats have somewhere to go.
        while ws.next().await.is_some() {}
    });

    let router = Arc::new(SubscriptionRouter::new());
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ChatMessage>();
    router.update_callbacks(
        move |msg| {
            let _ = msg_tx.send(msg);
        },
        |_| {},
    );

    let transport = WsTransport::new("7", broker_config(addr), router).unwrap();
    let mut state = transport.watch_state();
    transport.connect().await.unwrap();
    wait_for_state(&mut state, ConnectionState::Connected).await;

    let path = tokio::time::timeout(Duration::from_secs(5), path_rx)
        .await
        .unwrap()
        .unwrap();
    assert!(
        path.contains("userId=7"),
        "handshake must carry the user id, got {path}"
    );

    let received = tokio::time::timeout(Duration::from_secs(5), msg_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.sender_id, "42");
    assert_eq!(received.content, "hi");

    transport.disconnect().await.unwrap();
}

/// Published frames reach the broker with the requested destination.
#[tokio::test]
async fn publish_sends_frames_to_the_broker() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<BrokerFrame>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let frame: BrokerFrame = serde_json::from_str(text.as_str()).unwrap();
                let _ = frame_tx.send(frame);
            }
        }
    });

    let router = Arc::new(SubscriptionRouter::new());
    let transport = WsTransport::new("7", broker_config(addr), router).unwrap();
    let mut state = transport.watch_state();
    transport.connect().await.unwrap();
    wait_for_state(&mut state, ConnectionState::Connected).await;

    transport
        .publish(
            destinations::SEND_TYPING,
            serde_json::json!({"senderId": "7", "recipientId": "42", "isTyping": true}),
        )
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), frame_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame.destination, destinations::SEND_TYPING);
    assert_eq!(frame.body["isTyping"], true);

    transport.disconnect().await.unwrap();
}

/// Repeated connect calls share one socket: the broker sees a single
/// connection and inbound frames are dispatched exactly once.
#[tokio::test]
async fn connect_is_idempotent_for_the_same_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let server_accepts = accepts.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            server_accepts.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                while ws.next().await.is_some() {}
            });
        }
    });

    let router = Arc::new(SubscriptionRouter::new());
    let transport = WsTransport::new("7", broker_config(addr), router).unwrap();
    let mut state = transport.watch_state();

    transport.connect().await.unwrap();
    wait_for_state(&mut state, ConnectionState::Connected).await;
    transport.connect().await.unwrap();
    transport.connect().await.unwrap();

    // Give a would-be duplicate connection time to show up.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        accepts.load(Ordering::SeqCst),
        1,
        "repeated connects must not open parallel connections"
    );

    transport.disconnect().await.unwrap();
}

/// Dropped connections reconnect automatically after the fixed backoff and
/// re-establish the subscriptions without duplicate registration.
#[tokio::test]
async fn reconnects_after_broker_drop_without_duplicate_dispatch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let server_accepts = accepts.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let n = server_accepts.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                if n == 1 {
                    // First connection: drop immediately to simulate a broker
                    // failure mid-session.
                    let _ = ws.close(None).await;
                    return;
                }
                ws.send(Message::Text(
                    inbound_message_frame("42", "7", "after reconnect").into(),
                ))
                .await
                .unwrap();
                while ws.next().await.is_some() {}
            });
        }
    });

    let router = Arc::new(SubscriptionRouter::new());
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ChatMessage>();
    router.update_callbacks(
        move |msg| {
            let _ = msg_tx.send(msg);
        },
        |_| {},
    );

    let transport = WsTransport::new("7", broker_config(addr), router).unwrap();
    let mut state = transport.watch_state();
    transport.connect().await.unwrap();

    // The frame only exists on the second connection, so receiving it proves
    // the automatic retry happened.
    let received = tokio::time::timeout(Duration::from_secs(5), msg_rx.recv())
        .await
        .expect("reconnect did not happen in time")
        .unwrap();
    assert_eq!(received.content, "after reconnect");
    assert!(accepts.load(Ordering::SeqCst) >= 2);

    wait_for_state(&mut state, ConnectionState::Connected).await;

    // Exactly one dispatch: the router is shared across reconnects and never
    // registers a second callback.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(msg_rx.try_recv().is_err(), "message dispatched more than once");

    transport.disconnect().await.unwrap();
}

/// connect -> disconnect -> connect keeps at most one logical subscription
/// pair active at a time.
#[tokio::test]
async fn connect_disconnect_connect_cycle_keeps_single_subscription() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));

    let server_accepts = accepts.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let n = server_accepts.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                if n == 2 {
                    ws.send(Message::Text(
                        inbound_message_frame("42", "7", "second life").into(),
                    ))
                    .await
                    .unwrap();
                }
                while ws.next().await.is_some() {}
            });
        }
    });

    let router = Arc::new(SubscriptionRouter::new());
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ChatMessage>();
    router.update_callbacks(
        move |msg| {
            let _ = msg_tx.send(msg);
        },
        |_| {},
    );

    let transport = WsTransport::new("7", broker_config(addr), router).unwrap();
    let mut state = transport.watch_state();

    transport.connect().await.unwrap();
    wait_for_state(&mut state, ConnectionState::Connected).await;

    transport.disconnect().await.unwrap();
    assert_eq!(transport.state(), ConnectionState::Disconnected);

    transport.connect().await.unwrap();
    wait_for_state(&mut state, ConnectionState::Connected).await;

    let received = tokio::time::timeout(Duration::from_secs(5), msg_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.content, "second life");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(msg_rx.try_recv().is_err(), "stale subscription still dispatching");

    transport.disconnect().await.unwrap();
}
