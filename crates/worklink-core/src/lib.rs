// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Worklink chat client.
//!
//! This crate provides the shared data model, the error taxonomy, and the
//! [`Transport`] trait implemented by the broker connection. All other
//! Worklink crates build on the definitions here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WorklinkError;
pub use traits::Transport;
pub use types::{
    ChatMessage, ConnectionState, ConversationSummary, MessageType, TypingSignal, UserSummary,
};
