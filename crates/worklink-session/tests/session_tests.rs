// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behavior tests for the chat session manager, driven through a mock
//! transport and a wiremock REST backend.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use worklink_api::ChatApi;
use worklink_config::model::{ApiConfig, ChatConfig};
use worklink_core::error::WorklinkError;
use worklink_core::traits::Transport;
use worklink_core::types::{ConnectionState, TypingSignal};
use worklink_session::{ChatSession, SessionEvent};
use worklink_test_utils::{make_message, make_typing, MockTransport};
use worklink_transport::destinations;
use worklink_transport::router::SubscriptionRouter;

fn history_entry(id: i64, sender: &str, recipient: &str, content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "senderId": sender,
        "recipientId": recipient,
        "content": content,
        "messageType": "CHAT",
        "timestamp": "2026-03-01T10:00:00Z",
        "isRead": true
    })
}

/// Mounts an empty-history catch-all. Mount AFTER any recipient-specific
/// history mocks; wiremock picks the first mounted match.
async fn mount_empty_history(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/chat/history/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(server)
        .await;
}

fn build_session(
    server: &MockServer,
) -> (ChatSession, Arc<MockTransport>, Arc<SubscriptionRouter>) {
    let router = Arc::new(SubscriptionRouter::new());
    let transport = Arc::new(MockTransport::new(Arc::clone(&router)));
    let api = ChatApi::new(&ApiConfig {
        base_url: server.uri(),
        auth_token: None,
        timeout_secs: 5,
    })
    .unwrap();
    let config = ChatConfig {
        typing_quiet_secs: 1,
        typing_stale_secs: 6,
        refresh_interval_secs: 10,
    };
    let session = ChatSession::new(
        "7",
        Arc::clone(&transport) as Arc<dyn Transport>,
        router.clone(),
        api,
        config,
    );
    (session, transport, router)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn sent_messages_appear_immediately_in_send_order() {
    let server = MockServer::start().await;
    mount_empty_history(&server).await;
    let (session, transport, _router) = build_session(&server);

    session.start().await.unwrap();
    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;

    session.send_message("one").await.unwrap();
    session.send_message("two").await.unwrap();

    // Optimistic insert: visible before any server confirmation, in send
    // order, with no server-assigned id yet.
    let messages = session.messages();
    let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "two"]);
    assert!(messages.iter().all(|m| m.id.is_none()));
    assert!(messages.iter().all(|m| m.sender_id == "7"));

    let published = transport
        .published_bodies::<worklink_core::types::ChatMessage>(destinations::SEND_MESSAGE)
        .await;
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].content, "one");
}

#[tokio::test]
async fn send_while_disconnected_sets_error_and_publishes_nothing() {
    let server = MockServer::start().await;
    mount_empty_history(&server).await;
    let (session, transport, _router) = build_session(&server);

    session.start().await.unwrap();
    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;
    transport.set_state(ConnectionState::Disconnected);

    let err = session.send_message("hello").await.unwrap_err();
    assert!(matches!(err, WorklinkError::PublishDropped { .. }));

    assert!(session.messages().is_empty(), "no optimistic insert offline");
    assert_eq!(transport.published_count().await, 0);
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn inbound_messages_filter_to_active_view_but_buffer_in_background() {
    let server = MockServer::start().await;
    mount_empty_history(&server).await;
    let (session, transport, _router) = build_session(&server);

    session.start().await.unwrap();
    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;

    transport.inject_message(&make_message("42", "7", "hi"));
    transport.inject_message(&make_message("99", "7", "other"));

    let visible = session.messages();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].content, "hi");

    // The redesigned store retains the background conversation instead of
    // dropping it.
    assert_eq!(session.store().message_count("99"), 1);
}

#[tokio::test]
async fn typing_debounce_emits_true_once_then_false_after_quiet_period() {
    let server = MockServer::start().await;
    mount_empty_history(&server).await;
    let (session, transport, _router) = build_session(&server);

    session.start().await.unwrap();
    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;

    session.handle_typing().await;
    session.handle_typing().await;
    session.handle_typing().await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    let signals = transport
        .published_bodies::<TypingSignal>(destinations::SEND_TYPING)
        .await;
    assert_eq!(signals.len(), 1, "leading edge emits exactly one true signal");
    assert!(signals[0].is_typing);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let signals = transport
        .published_bodies::<TypingSignal>(destinations::SEND_TYPING)
        .await;
    assert_eq!(signals.len(), 2, "quiet period elapsed, false signal due");
    assert!(!signals[1].is_typing);
    assert_eq!(signals[1].recipient_id, "42");
}

#[tokio::test]
async fn typing_quiet_timer_resets_on_each_keystroke() {
    let server = MockServer::start().await;
    mount_empty_history(&server).await;
    let (session, transport, _router) = build_session(&server);

    session.start().await.unwrap();
    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;

    session.handle_typing().await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    session.handle_typing().await;

    // 1.3s after the first call, but only 0.7s after the second: the reset
    // timer must not have fired yet.
    tokio::time::sleep(Duration::from_millis(700)).await;
    let signals = transport
        .published_bodies::<TypingSignal>(destinations::SEND_TYPING)
        .await;
    assert_eq!(signals.len(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let signals = transport
        .published_bodies::<TypingSignal>(destinations::SEND_TYPING)
        .await;
    assert_eq!(signals.len(), 2);
    assert!(!signals[1].is_typing);
}

#[tokio::test]
async fn remote_typing_reflects_signals_from_the_active_recipient() {
    let server = MockServer::start().await;
    mount_empty_history(&server).await;
    let (session, transport, _router) = build_session(&server);

    session.start().await.unwrap();
    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;

    transport.inject_typing(&make_typing("42", "7", true));
    assert!(session.remote_typing());

    // A signal from someone else never flips the active indicator.
    transport.inject_typing(&make_typing("99", "7", true));
    session.set_active_recipient("42");
    assert!(session.remote_typing());

    transport.inject_typing(&make_typing("42", "7", false));
    assert!(!session.remote_typing());
}

#[tokio::test]
async fn history_round_trip_replaces_without_duplication_or_loss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/42"))
        .and(query_param("currentUserId", "7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([history_entry(1, "42", "7", "kept")])),
        )
        .mount(&server)
        .await;
    mount_empty_history(&server).await;
    let (session, _transport, _router) = build_session(&server);

    session.start().await.unwrap();

    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;
    assert_eq!(session.messages().len(), 1);

    session.set_active_recipient("43");
    wait_until(|| !session.loading()).await;
    assert!(session.messages().is_empty());

    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;
    let messages = session.messages();
    assert_eq!(messages.len(), 1, "re-fetch must replace, not append");
    assert_eq!(messages[0].content, "kept");
}

#[tokio::test]
async fn stale_in_flight_history_never_overwrites_the_active_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([history_entry(1, "42", "7", "stale")]))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/43"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([history_entry(2, "43", "7", "fresh")])),
        )
        .mount(&server)
        .await;
    let (session, _transport, _router) = build_session(&server);

    session.start().await.unwrap();
    session.set_active_recipient("42");
    // Abandon 42 while its load is still in flight.
    session.set_active_recipient("43");

    wait_until(|| !session.loading() && session.messages().len() == 1).await;
    // Let the slow 42 load complete and be discarded.
    tokio::time::sleep(Duration::from_millis(600)).await;

    let visible = session.messages();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].content, "fresh");
    assert_eq!(
        session.store().message_count("42"),
        0,
        "stale completion must be discarded entirely"
    );
}

#[tokio::test]
async fn transport_errors_surface_until_reconnect_clears_them() {
    let server = MockServer::start().await;
    mount_empty_history(&server).await;
    let (session, _transport, router) = build_session(&server);

    session.start().await.unwrap();

    router.dispatch_error("broker handshake failed: connection refused".to_string());
    let banner = session.last_error().expect("error should surface");
    assert!(banner.contains("handshake failed"));

    // Reconnection is automatic; success clears the banner.
    router.dispatch_connected();
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn mark_as_read_submits_receipt_without_blocking() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/chat/read/42"))
        .and(query_param("recipientId", "7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_empty_history(&server).await;
    let (session, _transport, _router) = build_session(&server);

    session.start().await.unwrap();
    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;

    session.mark_as_read();

    // Fire-and-forget: give the spawned task a beat, then let the mock's
    // expect(1) verify on drop.
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn session_events_broadcast_inbound_activity() {
    let server = MockServer::start().await;
    mount_empty_history(&server).await;
    let (session, transport, _router) = build_session(&server);

    let mut events = session.events();
    session.start().await.unwrap();
    session.set_active_recipient("42");
    wait_until(|| !session.loading()).await;

    transport.inject_message(&make_message("42", "7", "ping"));

    let mut saw_message = false;
    for _ in 0..8 {
        match tokio::time::timeout(Duration::from_secs(1), events.recv()).await {
            Ok(Ok(SessionEvent::MessageReceived(msg))) => {
                assert_eq!(msg.content, "ping");
                saw_message = true;
                break;
            }
            Ok(Ok(_)) => continue,
            _ => break,
        }
    }
    assert!(saw_message, "MessageReceived event not observed");
}
