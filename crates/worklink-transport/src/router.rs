// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription router: demultiplexes inbound broker frames into typed events.
//!
//! Frames on the per-user message queue become [`ChatMessage`] events; frames
//! on the typing-status queue become [`TypingSignal`] events. Dispatch targets
//! are replaceable at runtime via [`SubscriptionRouter::update_callbacks`], so
//! the active conversation's view can change without tearing down the broker
//! connection or resubscribing.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use worklink_core::types::{ChatMessage, TypingSignal};

use crate::frame::{destinations, BrokerFrame};

type MessageHandler = Arc<dyn Fn(ChatMessage) + Send + Sync>;
type TypingHandler = Arc<dyn Fn(TypingSignal) + Send + Sync>;
type ConnectHandler = Arc<dyn Fn() + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Swappable dispatch targets for typed inbound events.
#[derive(Default)]
struct EventHandlers {
    on_message: Option<MessageHandler>,
    on_typing: Option<TypingHandler>,
}

/// Connection lifecycle callbacks, registered once per session.
#[derive(Default)]
struct LifecycleHandlers {
    on_connect: Option<ConnectHandler>,
    on_error: Option<ErrorHandler>,
}

/// Translates raw inbound frames into typed events and dispatches them.
///
/// A single router instance is shared between the transport (producer side)
/// and the session manager (consumer side). Reconnects reuse the same router,
/// so re-established subscriptions never register duplicate dispatch targets.
pub struct SubscriptionRouter {
    handlers: ArcSwap<EventHandlers>,
    lifecycle: ArcSwap<LifecycleHandlers>,
}

impl Default for SubscriptionRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRouter {
    /// Creates a router with no registered callbacks. Events arriving before
    /// registration are dropped with a debug log.
    pub fn new() -> Self {
        Self {
            handlers: ArcSwap::from_pointee(EventHandlers::default()),
            lifecycle: ArcSwap::from_pointee(LifecycleHandlers::default()),
        }
    }

    /// Atomically replaces the message and typing dispatch targets.
    ///
    /// The previous callbacks stop receiving events as soon as the swap
    /// completes; no resubscription on the broker side is involved.
    pub fn update_callbacks(
        &self,
        on_message: impl Fn(ChatMessage) + Send + Sync + 'static,
        on_typing: impl Fn(TypingSignal) + Send + Sync + 'static,
    ) {
        self.handlers.store(Arc::new(EventHandlers {
            on_message: Some(Arc::new(on_message)),
            on_typing: Some(Arc::new(on_typing)),
        }));
    }

    /// Registers the connection lifecycle callbacks.
    pub fn set_lifecycle(
        &self,
        on_connect: impl Fn() + Send + Sync + 'static,
        on_error: impl Fn(String) + Send + Sync + 'static,
    ) {
        self.lifecycle.store(Arc::new(LifecycleHandlers {
            on_connect: Some(Arc::new(on_connect)),
            on_error: Some(Arc::new(on_error)),
        }));
    }

    /// Routes one inbound frame to the matching typed callback.
    ///
    /// Unknown destinations and malformed bodies are logged and dropped;
    /// inbound garbage must never take the connection down.
    pub fn route(&self, frame: BrokerFrame) {
        match frame.destination.as_str() {
            destinations::QUEUE_MESSAGES => {
                match serde_json::from_value::<ChatMessage>(frame.body) {
                    Ok(message) => {
                        if let Some(handler) = &self.handlers.load().on_message {
                            handler(message);
                        } else {
                            debug!("message frame dropped: no subscriber registered");
                        }
                    }
                    Err(e) => warn!(error = %e, "dropping malformed message frame"),
                }
            }
            destinations::QUEUE_TYPING => {
                match serde_json::from_value::<TypingSignal>(frame.body) {
                    Ok(signal) => {
                        if let Some(handler) = &self.handlers.load().on_typing {
                            handler(signal);
                        } else {
                            debug!("typing frame dropped: no subscriber registered");
                        }
                    }
                    Err(e) => warn!(error = %e, "dropping malformed typing frame"),
                }
            }
            other => debug!(destination = other, "dropping frame for unknown destination"),
        }
    }

    /// Invokes the on-connect lifecycle callback, if registered.
    pub fn dispatch_connected(&self) {
        if let Some(handler) = &self.lifecycle.load().on_connect {
            handler();
        }
    }

    /// Invokes the on-error lifecycle callback with a protocol error message.
    pub fn dispatch_error(&self, message: String) {
        warn!(error = %message, "broker protocol error");
        if let Some(handler) = &self.lifecycle.load().on_error {
            handler(message);
        }
    }
}
