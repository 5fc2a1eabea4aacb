// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Worklink chat client crates.
//!
//! Wire shapes use camelCase field names to match the platform backend's
//! JSON conventions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of chat message carried on the broker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Regular text message.
    Chat,
    /// User joined notification.
    Join,
    /// User left notification.
    Leave,
    /// Typing indicator carried as a message (legacy path).
    Typing,
    /// File attachment.
    File,
    /// Image attachment.
    Image,
}

/// A single chat message exchanged between two users.
///
/// Immutable once created. `id` is assigned by the backend on persistence;
/// locally-constructed optimistic messages carry `id: None` until (if ever)
/// the durable copy is re-fetched via history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned identifier; absent on optimistic local inserts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub recipient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    pub content: String,
    pub message_type: MessageType,
    /// Ordering key within a conversation. Client-generated for optimistic
    /// inserts, authoritative from the backend otherwise.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
}

impl ChatMessage {
    /// Returns the conversation key for this message as seen by `local_user`:
    /// whichever of sender/recipient is the other party.
    pub fn counterpart<'a>(&'a self, local_user: &str) -> &'a str {
        if self.sender_id == local_user {
            &self.recipient_id
        } else {
            &self.sender_id
        }
    }
}

/// Transient typing indicator. Consumed once, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub sender_id: String,
    pub recipient_id: String,
    pub is_typing: bool,
}

/// Lifecycle state of the broker transport.
///
/// Owned exclusively by the transport; observed by all conversations through
/// a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket open; reconnect pending or transport shut down.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Socket open and user queues subscribed.
    Connected,
    /// Protocol-level failure; reconnect pending.
    Errored,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Errored => write!(f, "errored"),
        }
    }
}

/// One row of the recent-conversations list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime<Utc>>,
    /// Server-derived; the client never computes unread counts locally.
    #[serde(default)]
    pub unread_count: u64,
}

/// A user as returned by global search and contact suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}
