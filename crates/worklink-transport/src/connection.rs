// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broker connection loop: handshake, heartbeats, and automatic reconnect.
//!
//! One loop instance drives the single logical connection for a session.
//! On transport-level closure the loop marks the state Disconnected and
//! retries with a fixed backoff; no caller action is required. Heartbeat
//! pings are sent on a fixed interval and inbound pings are answered, so
//! silent failures are detected in both directions.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use worklink_config::model::BrokerConfig;
use worklink_core::types::ConnectionState;

use crate::frame::BrokerFrame;
use crate::router::SubscriptionRouter;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Runs the connection loop until `cancel` fires.
///
/// Each iteration attempts one handshake. On success the socket is driven
/// until it closes; on failure the error is surfaced through the router.
/// Either way the loop sleeps for the configured reconnect delay before the
/// next attempt.
pub(crate) async fn run_connection_loop(
    user_id: String,
    config: BrokerConfig,
    router: Arc<SubscriptionRouter>,
    state_tx: watch::Sender<ConnectionState>,
    mut outbound_rx: mpsc::Receiver<BrokerFrame>,
    cancel: CancellationToken,
) {
    // Handshake carries the local user id so the broker can bind the two
    // per-user private queues to this connection.
    let url = format!("{}?userId={}", config.url, user_id);
    let heartbeat = Duration::from_secs(config.heartbeat_secs);
    let retry_delay = Duration::from_millis(config.reconnect_delay_ms);

    loop {
        state_tx.send_replace(ConnectionState::Connecting);

        tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = connect_async(url.as_str()) => match attempt {
                Ok((socket, _response)) => {
                    info!(user_id = %user_id, "broker connected");
                    state_tx.send_replace(ConnectionState::Connected);
                    router.dispatch_connected();

                    drive_socket(socket, &mut outbound_rx, heartbeat, &router, &cancel).await;

                    state_tx.send_replace(ConnectionState::Disconnected);
                    if cancel.is_cancelled() {
                        break;
                    }
                    warn!(
                        user_id = %user_id,
                        retry_ms = config.reconnect_delay_ms,
                        "broker connection lost, retrying"
                    );
                }
                Err(e) => {
                    state_tx.send_replace(ConnectionState::Errored);
                    router.dispatch_error(format!("broker handshake failed: {e}"));
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(retry_delay) => {}
        }
    }

    state_tx.send_replace(ConnectionState::Disconnected);
    debug!(user_id = %user_id, "broker connection loop stopped");
}

/// Drives one established socket: pumps outbound frames, dispatches inbound
/// frames through the router, and exchanges heartbeats. Returns when the
/// socket closes or the transport is cancelled.
async fn drive_socket(
    socket: Socket,
    outbound_rx: &mut mpsc::Receiver<BrokerFrame>,
    heartbeat: Duration,
    router: &SubscriptionRouter,
    cancel: &CancellationToken,
) {
    let (mut sink, mut stream) = socket.split();
    let mut ping_timer = tokio::time::interval(heartbeat);
    ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return;
            }
            frame = outbound_rx.recv() => match frame {
                Some(frame) => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, destination = %frame.destination, "failed to serialize outbound frame");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
                // The transport handle was dropped; nothing left to send.
                None => return,
            },
            _ = ping_timer.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    return;
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<BrokerFrame>(text.as_str()) {
                        Ok(frame) => router.route(frame),
                        Err(e) => warn!(error = %e, "dropping unparseable broker frame"),
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if sink.send(Message::Pong(payload)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    debug!("broker closed the connection");
                    return;
                }
                Some(Ok(_)) => {} // binary frames are not part of the protocol
                Some(Err(e)) => {
                    router.dispatch_error(format!("broker socket error: {e}"));
                    return;
                }
            }
        }
    }
}
