// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session manager.
//!
//! Owns one broker transport per local user session and multiplexes
//! per-recipient conversation state on top of it. The transport is an
//! injected, explicitly constructed instance; its lifetime is tied to the
//! authenticated session, and only this layer calls
//! connect/disconnect/publish. UI views observe the session and multiplex
//! through router callback replacement instead of opening parallel
//! connections.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use worklink_api::ChatApi;
use worklink_config::model::ChatConfig;
use worklink_core::error::WorklinkError;
use worklink_core::traits::Transport;
use worklink_core::types::{ChatMessage, MessageType, TypingSignal};
use worklink_transport::frame::destinations;
use worklink_transport::router::SubscriptionRouter;

use crate::store::ConversationStore;

/// Events emitted by the session for reactive consumers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// An inbound message was accepted into the store.
    MessageReceived(ChatMessage),
    /// A remote party's typing flag changed.
    TypingChanged { user_id: String, is_typing: bool },
    /// The broker connection (re-)established.
    Connected,
    /// A broker protocol error was surfaced.
    TransportError(String),
}

struct SessionInner {
    user_id: String,
    transport: Arc<dyn Transport>,
    router: Arc<SubscriptionRouter>,
    api: ChatApi,
    store: Arc<ConversationStore>,
    config: ChatConfig,
    active: ArcSwapOption<String>,
    loading: AtomicBool,
    last_error: Arc<ArcSwapOption<String>>,
    /// Monotonic counter guarding history loads: a completion whose
    /// generation is no longer current belongs to an abandoned recipient and
    /// must not touch the store.
    history_gen: AtomicU64,
    /// Leading-edge state of the typing debounce.
    typing_active: AtomicBool,
    /// Pending quiet-period timer; replaced (and the old one aborted) on
    /// every keystroke.
    typing_reset: ArcSwapOption<tokio::task::JoinHandle<()>>,
    events_tx: broadcast::Sender<SessionEvent>,
}

/// The chat session for one authenticated user.
///
/// Cheap to clone: clones share all state.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

impl ChatSession {
    /// Creates a session wiring `transport`, its `router`, and the REST
    /// collaborator client together for `user_id`.
    pub fn new(
        user_id: impl Into<String>,
        transport: Arc<dyn Transport>,
        router: Arc<SubscriptionRouter>,
        api: ChatApi,
        config: ChatConfig,
    ) -> Self {
        let user_id = user_id.into();
        let (events_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(SessionInner {
                store: Arc::new(ConversationStore::new(user_id.clone())),
                user_id,
                transport,
                router,
                api,
                config,
                active: ArcSwapOption::empty(),
                loading: AtomicBool::new(false),
                last_error: Arc::new(ArcSwapOption::empty()),
                history_gen: AtomicU64::new(0),
                typing_active: AtomicBool::new(false),
                typing_reset: ArcSwapOption::empty(),
                events_tx,
            }),
        }
    }

    /// Registers dispatch callbacks on the router and connects the transport.
    ///
    /// Safe to call again after a manual disconnect; the transport's connect
    /// is idempotent while a connection is live.
    pub async fn start(&self) -> Result<(), WorklinkError> {
        self.register_callbacks();
        self.inner.transport.connect().await
    }

    /// Tears down the session: cancels the typing timer and deactivates the
    /// transport.
    pub async fn shutdown(&self) -> Result<(), WorklinkError> {
        if let Some(timer) = self.inner.typing_reset.swap(None) {
            timer.abort();
        }
        self.inner.transport.disconnect().await
    }

    /// Switches the active conversation and triggers a history load for it.
    ///
    /// The dispatch callbacks are re-registered through the router (swap, not
    /// resubscribe), and the previous recipient's in-flight history load is
    /// invalidated via the generation counter.
    pub fn set_active_recipient(&self, recipient_id: &str) {
        self.inner
            .active
            .store(Some(Arc::new(recipient_id.to_string())));
        self.register_callbacks();

        let generation = self.begin_history_load();
        let this = self.clone();
        let recipient = recipient_id.to_string();
        tokio::spawn(async move {
            let _ = this.run_history_load(recipient, generation).await;
        });
    }

    /// Re-fetches history for the active recipient, replacing the local
    /// list. Exposed for user-triggered retry after a failed load.
    pub async fn load_history(&self) -> Result<(), WorklinkError> {
        let Some(recipient) = self.active_recipient() else {
            return Err(WorklinkError::Internal(
                "no active recipient to load history for".into(),
            ));
        };
        let generation = self.begin_history_load();
        self.run_history_load(recipient, generation).await
    }

    /// Constructs a message with a client-generated timestamp, appends it to
    /// the active conversation immediately (optimistic insert, visible
    /// before any server confirmation), then publishes it.
    ///
    /// While disconnected nothing is appended or published: the session
    /// error state is set and [`WorklinkError::PublishDropped`] is returned,
    /// so callers can disable the send control instead of losing messages
    /// silently.
    pub async fn send_message(&self, content: &str) -> Result<(), WorklinkError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }
        let Some(recipient) = self.active_recipient() else {
            return Err(WorklinkError::Internal("no active recipient".into()));
        };

        if !self.is_connected() {
            self.set_error("cannot send while disconnected".to_string());
            return Err(WorklinkError::PublishDropped {
                destination: destinations::SEND_MESSAGE.to_string(),
            });
        }

        let message = ChatMessage {
            id: None,
            sender_id: self.inner.user_id.clone(),
            sender_name: None,
            recipient_id: recipient.clone(),
            recipient_name: None,
            content: content.to_string(),
            message_type: MessageType::Chat,
            timestamp: Utc::now(),
            is_read: None,
        };

        let body = serde_json::to_value(&message)
            .map_err(|e| WorklinkError::Internal(format!("message serialization failed: {e}")))?;

        self.inner.store.append_local(&recipient, message);

        match self
            .inner
            .transport
            .publish(destinations::SEND_MESSAGE, body)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                self.set_error(format!("message not delivered: {e}"));
                Err(e)
            }
        }
    }

    /// Debounced typing indicator.
    ///
    /// The first call emits typing=true immediately; repeated calls within
    /// the quiet period do not re-emit but reset the quiet-period timer.
    /// Once the quiet period elapses with no further calls, typing=false is
    /// emitted.
    pub async fn handle_typing(&self) {
        let Some(recipient) = self.active_recipient() else {
            return;
        };

        if !self.inner.typing_active.swap(true, Ordering::SeqCst) {
            self.publish_typing(&recipient, true).await;
        }

        let quiet = Duration::from_secs(self.inner.config.typing_quiet_secs);
        let this = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            this.inner.typing_active.store(false, Ordering::SeqCst);
            if let Some(recipient) = this.active_recipient() {
                this.publish_typing(&recipient, false).await;
            }
        });

        if let Some(previous) = self.inner.typing_reset.swap(Some(Arc::new(timer))) {
            previous.abort();
        }
    }

    /// Fire-and-forget read receipt for the active conversation. Failures
    /// are logged, never surfaced; the UI must not block on this.
    pub fn mark_as_read(&self) {
        let Some(recipient) = self.active_recipient() else {
            return;
        };
        let api = self.inner.api.clone();
        let user_id = self.inner.user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = api.mark_read(&recipient, &user_id).await {
                warn!(error = %e, recipient = %recipient, "read receipt failed");
            }
        });
    }

    // --- state exposed to the UI ---

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn active_recipient(&self) -> Option<String> {
        self.inner.active.load_full().map(|r| (*r).clone())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.transport.state() == worklink_core::types::ConnectionState::Connected
    }

    /// Whether the active recipient is currently typing.
    pub fn remote_typing(&self) -> bool {
        self.active_recipient()
            .map(|r| self.inner.store.is_typing(&r))
            .unwrap_or(false)
    }

    /// Whether a history fetch is in flight.
    pub fn loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    /// Last surfaced error, cleared on reconnect.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.load_full().map(|e| (*e).clone())
    }

    /// The active conversation's ordered messages (read-only projection).
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.active_recipient()
            .map(|r| self.inner.store.messages(&r))
            .unwrap_or_default()
    }

    /// The underlying keyed store, for consumers that render more than the
    /// active projection.
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.inner.store
    }

    /// Subscribes to session events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events_tx.subscribe()
    }

    // --- internals ---

    /// Registers store-routing callbacks on the shared router. Called on
    /// start and on every active-recipient switch; the router swaps targets
    /// atomically without resubscribing on the broker.
    fn register_callbacks(&self) {
        let store = Arc::clone(&self.inner.store);
        let events = self.inner.events_tx.clone();
        let on_message = move |message: ChatMessage| {
            store.apply_inbound(message.clone());
            let _ = events.send(SessionEvent::MessageReceived(message));
        };

        let store = Arc::clone(&self.inner.store);
        let events = self.inner.events_tx.clone();
        let stale_after = Duration::from_secs(self.inner.config.typing_stale_secs);
        let on_typing = move |signal: TypingSignal| {
            store.apply_typing(&signal, stale_after);
            let _ = events.send(SessionEvent::TypingChanged {
                user_id: signal.sender_id.clone(),
                is_typing: signal.is_typing,
            });
        };

        self.inner.router.update_callbacks(on_message, on_typing);

        let last_error = Arc::clone(&self.inner.last_error);
        let events = self.inner.events_tx.clone();
        let on_connect = move || {
            last_error.store(None);
            let _ = events.send(SessionEvent::Connected);
        };

        let last_error = Arc::clone(&self.inner.last_error);
        let events = self.inner.events_tx.clone();
        let on_error = move |message: String| {
            last_error.store(Some(Arc::new(message.clone())));
            let _ = events.send(SessionEvent::TransportError(message));
        };

        self.inner.router.set_lifecycle(on_connect, on_error);
    }

    fn begin_history_load(&self) -> u64 {
        self.inner.loading.store(true, Ordering::SeqCst);
        self.inner.history_gen.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn run_history_load(
        &self,
        recipient: String,
        generation: u64,
    ) -> Result<(), WorklinkError> {
        let result = self
            .inner
            .api
            .history(&self.inner.user_id, &recipient)
            .await;

        // A switch bumped the generation while this fetch was in flight; the
        // now-active conversation must not be overwritten by a stale result.
        if self.inner.history_gen.load(Ordering::SeqCst) != generation {
            debug!(recipient = %recipient, "discarding stale history load");
            return Ok(());
        }

        self.inner.loading.store(false, Ordering::SeqCst);
        match result {
            Ok(messages) => {
                self.inner.store.replace_history(&recipient, messages);
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("failed to load chat history: {e}"));
                Err(e)
            }
        }
    }

    async fn publish_typing(&self, recipient: &str, is_typing: bool) {
        let signal = TypingSignal {
            sender_id: self.inner.user_id.clone(),
            recipient_id: recipient.to_string(),
            is_typing,
        };
        let body = match serde_json::to_value(&signal) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "typing signal serialization failed");
                return;
            }
        };
        // Typing signals are best-effort; a drop while disconnected is not
        // an error the user needs to see.
        if let Err(e) = self
            .inner
            .transport
            .publish(destinations::SEND_TYPING, body)
            .await
        {
            debug!(error = %e, "typing signal dropped");
        }
    }

    fn set_error(&self, message: String) {
        warn!(error = %message, "session error");
        self.inner.last_error.store(Some(Arc::new(message)));
    }
}
