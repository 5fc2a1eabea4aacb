// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire format for broker frames.
//!
//! Every WebSocket text frame in either direction is a JSON envelope carrying
//! a destination and a body. Outbound destinations are application routes;
//! inbound destinations are the per-user private queues subscribed during the
//! handshake.

use serde::{Deserialize, Serialize};

/// Destinations understood by the broker.
pub mod destinations {
    /// Outbound: send a chat message.
    pub const SEND_MESSAGE: &str = "/app/chat.sendMessage";
    /// Outbound: send a typing indicator.
    pub const SEND_TYPING: &str = "/app/chat.typing";
    /// Inbound: the local user's private message queue.
    pub const QUEUE_MESSAGES: &str = "/user/queue/messages";
    /// Inbound: the local user's private typing-status queue.
    pub const QUEUE_TYPING: &str = "/user/queue/typing";
}

/// A single frame on the broker connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerFrame {
    pub destination: String,
    pub body: serde_json::Value,
}

impl BrokerFrame {
    /// Builds a frame for `destination` carrying `body`.
    pub fn new(destination: &str, body: serde_json::Value) -> Self {
        Self {
            destination: destination.to_string(),
            body,
        }
    }
}
