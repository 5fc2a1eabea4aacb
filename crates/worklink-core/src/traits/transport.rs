// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broker transport trait for publish/subscribe chat connectivity.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::WorklinkError;
use crate::types::ConnectionState;

/// A duplex connection to the chat broker, scoped to one local user.
///
/// Implementations own the connection lifecycle (handshake, heartbeats,
/// automatic reconnect) and deliver inbound events through a subscription
/// router constructed by the caller. At most one logical connection is
/// active per local user; `connect` is idempotent.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establishes the broker connection. No-op if already connected for
    /// this session; the on-connect callback fires immediately in that case.
    async fn connect(&self) -> Result<(), WorklinkError>;

    /// Deactivates the connection. Idempotent.
    async fn disconnect(&self) -> Result<(), WorklinkError>;

    /// Current lifecycle state of the connection.
    fn state(&self) -> ConnectionState;

    /// A watch receiver observing lifecycle state transitions.
    fn watch_state(&self) -> watch::Receiver<ConnectionState>;

    /// Serializes `body` and sends it to `destination`, only while Connected.
    ///
    /// While not Connected the frame is dropped with
    /// [`WorklinkError::PublishDropped`], never queued, so a flaky link
    /// cannot buffer messages unboundedly.
    async fn publish(
        &self,
        destination: &str,
        body: serde_json::Value,
    ) -> Result<(), WorklinkError>;
}
