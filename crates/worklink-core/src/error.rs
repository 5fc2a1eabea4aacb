// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Worklink chat client.

use thiserror::Error;

/// The primary error type used across the Worklink chat client crates.
///
/// Connection-level errors are retried automatically by the transport and
/// surfaced (not thrown) to the UI layer; REST call failures are caught at
/// the call site and reported through session error state.
#[derive(Debug, Error)]
pub enum WorklinkError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Broker transport errors (handshake failure, protocol violation, socket closure).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A publish was attempted while the transport was not connected.
    ///
    /// The frame is dropped, never queued; callers surface this to the user
    /// instead of silently losing the message.
    #[error("publish to {destination} dropped: transport not connected")]
    PublishDropped { destination: String },

    /// REST collaborator errors (history fetch, read receipt, list refresh).
    /// Recoverable via caller-triggered retry.
    #[error("request error: {message}")]
    Request {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
