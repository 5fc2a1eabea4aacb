// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state and session orchestration for the Worklink chat client.
//!
//! [`ChatSession`] wires the broker transport, the subscription router, and
//! the REST collaborator client together and exposes the operations a chat
//! view consumes: optimistic send, debounced typing, history loads with
//! stale-completion guards, and fire-and-forget read receipts.
//! [`ConversationStore`] holds the keyed per-recipient state;
//! [`ListRefresher`] polls the conversation and suggestion lists.

pub mod refresh;
pub mod session;
pub mod store;

pub use refresh::ListRefresher;
pub use session::{ChatSession, SessionEvent};
pub use store::ConversationStore;
