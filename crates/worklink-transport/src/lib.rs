// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket broker transport for the Worklink chat client.
//!
//! Implements [`Transport`] over tokio-tungstenite: one persistent duplex
//! connection per local user with heartbeats, automatic reconnection on a
//! fixed backoff, and a [`SubscriptionRouter`] that demultiplexes the two
//! per-user private queues into typed events.

pub mod connection;
pub mod frame;
pub mod router;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use worklink_config::model::BrokerConfig;
use worklink_core::error::WorklinkError;
use worklink_core::traits::Transport;
use worklink_core::types::ConnectionState;

use crate::frame::BrokerFrame;
use crate::router::SubscriptionRouter;

pub use crate::frame::destinations;

/// Outbound frames buffered between `publish` and the socket writer.
/// Small on purpose: frames are only accepted while Connected, so this never
/// grows into an unbounded reconnect queue.
const OUTBOUND_BUFFER: usize = 64;

/// Tracks the single connection task for a session.
struct ConnHandle {
    task: Option<tokio::task::JoinHandle<()>>,
    cancel: CancellationToken,
}

/// The broker connection for one local user session.
///
/// Explicitly constructed and injected into the session manager; its lifetime
/// is tied to the authenticated session, not to process globals. Only the
/// session manager layer calls connect/disconnect/publish; UI views share
/// this one transport and multiplex through router callback replacement.
pub struct WsTransport {
    user_id: String,
    config: BrokerConfig,
    router: Arc<SubscriptionRouter>,
    state_tx: watch::Sender<ConnectionState>,
    outbound_tx: RwLock<Option<mpsc::Sender<BrokerFrame>>>,
    conn: Mutex<ConnHandle>,
}

impl WsTransport {
    /// Creates a transport for `user_id` against the configured broker.
    ///
    /// The router is shared with the session manager, which registers the
    /// dispatch callbacks on it.
    pub fn new(
        user_id: impl Into<String>,
        config: BrokerConfig,
        router: Arc<SubscriptionRouter>,
    ) -> Result<Self, WorklinkError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(WorklinkError::Config(
                "a user id is required for the broker handshake".into(),
            ));
        }

        let (state_tx, _state_rx) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            user_id,
            config,
            router,
            state_tx,
            outbound_tx: RwLock::new(None),
            conn: Mutex::new(ConnHandle {
                task: None,
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// The local user this transport is scoped to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The router dispatching this transport's inbound events.
    pub fn router(&self) -> &Arc<SubscriptionRouter> {
        &self.router
    }
}

#[async_trait]
impl Transport for WsTransport {
    /// Idempotent connect: if the connection loop is already running, no new
    /// socket is opened. When already Connected the on-connect callback fires
    /// immediately so callers observe the same contract as a fresh connect.
    async fn connect(&self) -> Result<(), WorklinkError> {
        let mut conn = self.conn.lock().await;

        if let Some(task) = &conn.task {
            if !task.is_finished() {
                debug!(user_id = %self.user_id, "connect: connection loop already active");
                if *self.state_tx.borrow() == ConnectionState::Connected {
                    self.router.dispatch_connected();
                }
                return Ok(());
            }
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        *self.outbound_tx.write().await = Some(tx);

        conn.cancel = cancel.clone();
        conn.task = Some(tokio::spawn(connection::run_connection_loop(
            self.user_id.clone(),
            self.config.clone(),
            Arc::clone(&self.router),
            self.state_tx.clone(),
            rx,
            cancel,
        )));

        Ok(())
    }

    /// Deactivates the connection loop. Idempotent: repeated calls after
    /// shutdown are no-ops.
    async fn disconnect(&self) -> Result<(), WorklinkError> {
        let mut conn = self.conn.lock().await;
        conn.cancel.cancel();
        if let Some(task) = conn.task.take() {
            let _ = task.await;
        }
        *self.outbound_tx.write().await = None;
        self.state_tx.send_replace(ConnectionState::Disconnected);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Sends a frame only while Connected; otherwise the frame is dropped
    /// with [`WorklinkError::PublishDropped`] so the caller can warn the user
    /// instead of buffering messages into a dead link.
    async fn publish(
        &self,
        destination: &str,
        body: serde_json::Value,
    ) -> Result<(), WorklinkError> {
        if self.state() != ConnectionState::Connected {
            debug!(destination, "publish dropped while not connected");
            return Err(WorklinkError::PublishDropped {
                destination: destination.to_string(),
            });
        }

        let tx = self.outbound_tx.read().await.clone();
        match tx {
            Some(tx) => tx
                .send(BrokerFrame::new(destination, body))
                .await
                .map_err(|_| WorklinkError::Transport {
                    message: "connection task stopped while sending".into(),
                    source: None,
                }),
            None => Err(WorklinkError::PublishDropped {
                destination: destination.to_string(),
            }),
        }
    }
}
