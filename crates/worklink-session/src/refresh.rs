// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling refresh for the conversation and suggestion lists.
//!
//! The backend pushes live messages over the broker, but the recent
//! conversations list (with server-derived unread counts) and contact
//! suggestions are refreshed on a fixed-interval timer. The interval task is
//! a scoped resource: cancellation is guaranteed on shutdown or drop.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use worklink_api::ChatApi;
use worklink_core::types::{ConversationSummary, UserSummary};

struct Snapshots {
    conversations: ArcSwap<Vec<ConversationSummary>>,
    suggestions: ArcSwap<Vec<UserSummary>>,
}

/// Periodically refreshes the conversation and suggestion lists.
pub struct ListRefresher {
    snapshots: Arc<Snapshots>,
    cancel: CancellationToken,
}

impl ListRefresher {
    /// Spawns the refresh task: one immediate fetch, then one per interval.
    ///
    /// Fetch failures are logged and the previous snapshot is retained, so a
    /// flaky backend degrades to a stale list instead of an empty one.
    pub fn spawn(api: ChatApi, user_id: impl Into<String>, interval: Duration) -> Self {
        let user_id = user_id.into();
        let snapshots = Arc::new(Snapshots {
            conversations: ArcSwap::from_pointee(Vec::new()),
            suggestions: ArcSwap::from_pointee(Vec::new()),
        });
        let cancel = CancellationToken::new();

        let task_snapshots = Arc::clone(&snapshots);
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        debug!("list refresher stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        refresh_once(&api, &user_id, &task_snapshots).await;
                    }
                }
            }
        });

        Self { snapshots, cancel }
    }

    /// Latest conversation list snapshot.
    pub fn conversations(&self) -> Vec<ConversationSummary> {
        (**self.snapshots.conversations.load()).clone()
    }

    /// Latest contact suggestions snapshot.
    pub fn suggestions(&self) -> Vec<UserSummary> {
        (**self.snapshots.suggestions.load()).clone()
    }

    /// Stops the refresh task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ListRefresher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn refresh_once(api: &ChatApi, user_id: &str, snapshots: &Snapshots) {
    match api.conversations(user_id).await {
        Ok(conversations) => snapshots.conversations.store(Arc::new(conversations)),
        Err(e) => warn!(error = %e, "conversation list refresh failed, keeping previous snapshot"),
    }
    match api.suggestions(user_id).await {
        Ok(suggestions) => snapshots.suggestions.store(Arc::new(suggestions)),
        Err(e) => warn!(error = %e, "suggestions refresh failed, keeping previous snapshot"),
    }
}
