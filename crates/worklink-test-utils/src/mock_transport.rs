// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock broker transport for deterministic testing.
//!
//! `MockTransport` implements [`Transport`] with captured published frames
//! and injectable inbound events routed through the shared
//! [`SubscriptionRouter`], so session-level behavior can be exercised without
//! sockets.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use worklink_core::error::WorklinkError;
use worklink_core::traits::Transport;
use worklink_core::types::{ChatMessage, ConnectionState, MessageType, TypingSignal};
use worklink_transport::frame::{destinations, BrokerFrame};
use worklink_transport::router::SubscriptionRouter;

/// A mock broker transport for testing.
///
/// - `publish()` captures frames while Connected and refuses them otherwise,
///   matching the real transport's drop-with-error contract.
/// - `inject_message()` / `inject_typing()` push inbound events through the
///   router exactly as frames arriving on the per-user queues would.
pub struct MockTransport {
    router: Arc<SubscriptionRouter>,
    state_tx: watch::Sender<ConnectionState>,
    published: Mutex<Vec<BrokerFrame>>,
}

impl MockTransport {
    /// Creates a disconnected mock sharing `router` with the code under test.
    pub fn new(router: Arc<SubscriptionRouter>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            router,
            state_tx,
            published: Mutex::new(Vec::new()),
        }
    }

    /// Forces the connection state, without firing lifecycle callbacks.
    pub fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Simulates an inbound frame on the private message queue.
    pub fn inject_message(&self, message: &ChatMessage) {
        let body = serde_json::to_value(message).expect("message serializes");
        self.router
            .route(BrokerFrame::new(destinations::QUEUE_MESSAGES, body));
    }

    /// Simulates an inbound frame on the private typing-status queue.
    pub fn inject_typing(&self, signal: &TypingSignal) {
        let body = serde_json::to_value(signal).expect("signal serializes");
        self.router
            .route(BrokerFrame::new(destinations::QUEUE_TYPING, body));
    }

    /// All frames captured by `publish()` so far.
    pub async fn published(&self) -> Vec<BrokerFrame> {
        self.published.lock().await.clone()
    }

    /// Count of captured frames.
    pub async fn published_count(&self) -> usize {
        self.published.lock().await.len()
    }

    /// Captured frames for one destination, decoded as `T`.
    pub async fn published_bodies<T: serde::de::DeserializeOwned>(
        &self,
        destination: &str,
    ) -> Vec<T> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|frame| frame.destination == destination)
            .map(|frame| {
                serde_json::from_value(frame.body.clone()).expect("published body decodes")
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<(), WorklinkError> {
        self.state_tx.send_replace(ConnectionState::Connected);
        self.router.dispatch_connected();
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), WorklinkError> {
        self.state_tx.send_replace(ConnectionState::Disconnected);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    async fn publish(
        &self,
        destination: &str,
        body: serde_json::Value,
    ) -> Result<(), WorklinkError> {
        if self.state() != ConnectionState::Connected {
            return Err(WorklinkError::PublishDropped {
                destination: destination.to_string(),
            });
        }
        self.published
            .lock()
            .await
            .push(BrokerFrame::new(destination, body));
        Ok(())
    }
}

/// Builds a plain chat message for tests.
pub fn make_message(sender: &str, recipient: &str, content: &str) -> ChatMessage {
    ChatMessage {
        id: None,
        sender_id: sender.to_string(),
        sender_name: None,
        recipient_id: recipient.to_string(),
        recipient_name: None,
        content: content.to_string(),
        message_type: MessageType::Chat,
        timestamp: chrono::Utc::now(),
        is_read: None,
    }
}

/// Builds a typing signal for tests.
pub fn make_typing(sender: &str, recipient: &str, is_typing: bool) -> TypingSignal {
    TypingSignal {
        sender_id: sender.to_string(),
        recipient_id: recipient.to_string(),
        is_typing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_refused_until_connected() {
        let router = Arc::new(SubscriptionRouter::new());
        let transport = MockTransport::new(router);

        let err = transport
            .publish(destinations::SEND_MESSAGE, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, WorklinkError::PublishDropped { .. }));

        transport.connect().await.unwrap();
        transport
            .publish(destinations::SEND_MESSAGE, serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(transport.published_count().await, 1);
    }

    #[tokio::test]
    async fn injected_messages_flow_through_the_router() {
        let router = Arc::new(SubscriptionRouter::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ChatMessage>();
        router.update_callbacks(
            move |msg| {
                let _ = tx.send(msg);
            },
            |_| {},
        );

        let transport = MockTransport::new(router);
        transport.inject_message(&make_message("42", "7", "hello"));

        let received = rx.try_recv().expect("message should dispatch synchronously");
        assert_eq!(received.content, "hello");
    }
}
