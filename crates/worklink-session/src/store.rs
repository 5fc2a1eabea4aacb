// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed conversation state store.
//!
//! Every inbound event is appended into a map keyed by the other party's
//! user id, regardless of which conversation is currently on screen; the
//! "active conversation" is a read-only projection over one key. Background
//! conversations therefore keep receiving live messages while a different
//! recipient is selected.
//!
//! Message lists are append-only from the client's perspective: no mutation,
//! no deletion, no dedup. A history re-fetch replaces a conversation's list
//! wholesale.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use worklink_core::types::{ChatMessage, TypingSignal};

/// Per-recipient conversation state.
#[derive(Debug, Default)]
struct Conversation {
    messages: Vec<ChatMessage>,
    /// Deadline after which the remote typing indicator is considered stale.
    /// Bounds staleness when the sender's typing=false signal is lost.
    typing_until: Option<Instant>,
}

/// The set of known conversations for one local user.
///
/// Conversations are created lazily on first event or first selection and
/// never destroyed for the lifetime of the store.
pub struct ConversationStore {
    local_user: String,
    conversations: DashMap<String, Conversation>,
}

impl ConversationStore {
    pub fn new(local_user: impl Into<String>) -> Self {
        Self {
            local_user: local_user.into(),
            conversations: DashMap::new(),
        }
    }

    /// The local user this store belongs to.
    pub fn local_user(&self) -> &str {
        &self.local_user
    }

    /// Accepts an inbound message into the conversation keyed by whichever
    /// of {sender, recipient} is not the local user.
    pub fn apply_inbound(&self, message: ChatMessage) {
        let key = message.counterpart(&self.local_user).to_string();
        self.conversations.entry(key).or_default().messages.push(message);
    }

    /// Appends a locally-sent message to `recipient`'s conversation
    /// (optimistic insert, before any server confirmation).
    pub fn append_local(&self, recipient: &str, message: ChatMessage) {
        self.conversations
            .entry(recipient.to_string())
            .or_default()
            .messages
            .push(message);
    }

    /// Replaces `recipient`'s message list with freshly fetched history.
    pub fn replace_history(&self, recipient: &str, messages: Vec<ChatMessage>) {
        self.conversations
            .entry(recipient.to_string())
            .or_default()
            .messages = messages;
    }

    /// Snapshot of `recipient`'s ordered message list.
    pub fn messages(&self, recipient: &str) -> Vec<ChatMessage> {
        self.conversations
            .get(recipient)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Number of messages held for `recipient`.
    pub fn message_count(&self, recipient: &str) -> usize {
        self.conversations
            .get(recipient)
            .map(|c| c.messages.len())
            .unwrap_or(0)
    }

    /// Flips the typing flag for the signal's sender.
    ///
    /// A true signal arms a staleness deadline; the sender's own false
    /// signal clears the flag immediately.
    pub fn apply_typing(&self, signal: &TypingSignal, stale_after: Duration) {
        let mut conversation = self
            .conversations
            .entry(signal.sender_id.clone())
            .or_default();
        conversation.typing_until = signal
            .is_typing
            .then(|| Instant::now() + stale_after);
    }

    /// Whether `recipient` is currently typing, accounting for staleness.
    pub fn is_typing(&self, recipient: &str) -> bool {
        self.conversations
            .get(recipient)
            .and_then(|c| c.typing_until)
            .map(|deadline| Instant::now() < deadline)
            .unwrap_or(false)
    }

    /// User ids of all conversations seen so far.
    pub fn known_recipients(&self) -> Vec<String> {
        self.conversations
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}
