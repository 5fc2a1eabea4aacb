// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `worklink status` command implementation.
//!
//! Probes the REST backend (unread count, conversation list) and the broker
//! endpoint (handshake within a short timeout), then prints a connectivity
//! summary. Falls back gracefully when either side is unreachable.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use worklink_api::ChatApi;
use worklink_config::WorklinkConfig;
use worklink_core::error::WorklinkError;
use worklink_core::traits::Transport;
use worklink_core::types::ConnectionState;
use worklink_transport::router::SubscriptionRouter;
use worklink_transport::WsTransport;

/// How long to wait for the broker handshake before reporting it down.
const BROKER_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub user_id: String,
    pub backend_url: String,
    pub backend_reachable: bool,
    pub unread_count: Option<u64>,
    pub conversation_count: Option<usize>,
    pub broker_url: String,
    pub broker_reachable: bool,
}

/// Run the `worklink status` command.
pub async fn run_status(
    config: &WorklinkConfig,
    user_id: &str,
    json: bool,
) -> Result<(), WorklinkError> {
    let api = ChatApi::new(&config.api)?;

    let unread = api.unread_count(user_id).await.ok();
    let conversations = api.conversations(user_id).await.ok();
    let backend_reachable = unread.is_some() || conversations.is_some();

    let broker_reachable = probe_broker(config, user_id).await;

    let report = StatusReport {
        user_id: user_id.to_string(),
        backend_url: config.api.base_url.clone(),
        backend_reachable,
        unread_count: unread,
        conversation_count: conversations.as_ref().map(Vec::len),
        broker_url: config.broker.url.clone(),
        broker_reachable,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Opens a probe connection to the broker and waits briefly for the
/// handshake. The probe transport is torn down before returning.
async fn probe_broker(config: &WorklinkConfig, user_id: &str) -> bool {
    let router = Arc::new(SubscriptionRouter::new());
    let transport = match WsTransport::new(user_id, config.broker.clone(), router) {
        Ok(transport) => transport,
        Err(_) => return false,
    };

    if transport.connect().await.is_err() {
        return false;
    }

    let mut state = transport.watch_state();
    let connected = tokio::time::timeout(BROKER_PROBE_TIMEOUT, async {
        loop {
            if *state.borrow_and_update() == ConnectionState::Connected {
                return;
            }
            if state.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .is_ok();

    let _ = transport.disconnect().await;
    connected
}

fn print_report(report: &StatusReport) {
    let use_color = std::io::stdout().is_terminal();
    let mark = |ok: bool| -> String {
        let text = if ok { "ok" } else { "unreachable" };
        if !use_color {
            return text.to_string();
        }
        if ok {
            text.green().to_string()
        } else {
            text.red().to_string()
        }
    };

    println!("user:      {}", report.user_id);
    println!("backend:   {} [{}]", report.backend_url, mark(report.backend_reachable));
    if let Some(unread) = report.unread_count {
        println!("unread:    {unread}");
    }
    if let Some(count) = report.conversation_count {
        println!("recent:    {count} conversations");
    }
    println!("broker:    {} [{}]", report.broker_url, mark(report.broker_reachable));
}
