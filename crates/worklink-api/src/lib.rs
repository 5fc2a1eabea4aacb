// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST client for the chat backend's durable collaborators.
//!
//! The broker carries only live events; message history, the recent
//! conversations list, contact suggestions, global user search, read
//! receipts, and unread counts are served over plain HTTP with a bearer
//! credential header. All failures map to [`WorklinkError::Request`]:
//! transient, retryable at the call site, never fatal to the session.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::debug;

use worklink_config::model::ApiConfig;
use worklink_core::error::WorklinkError;
use worklink_core::types::{ChatMessage, ConversationSummary, UserSummary};

/// HTTP client for the chat REST endpoints.
///
/// Cheap to clone; connection pooling lives in the inner reqwest client.
#[derive(Debug, Clone)]
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
}

impl ChatApi {
    /// Creates a client for the configured backend.
    ///
    /// The bearer credential, when configured, is attached to every request
    /// as a default header.
    pub fn new(config: &ApiConfig) -> Result<Self, WorklinkError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                WorklinkError::Config(format!("invalid auth token header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WorklinkError::Request {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Durable message history between the local user and `other_user_id`,
    /// oldest first. Replaces, never appends to, the local conversation list.
    pub async fn history(
        &self,
        current_user_id: &str,
        other_user_id: &str,
    ) -> Result<Vec<ChatMessage>, WorklinkError> {
        let url = format!("{}/api/chat/history/{other_user_id}", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("currentUserId", current_user_id)])
            .send()
            .await
            .map_err(|e| request_error("history request failed", e))?
            .error_for_status()
            .map_err(|e| request_error("history request rejected", e))?;

        response
            .json()
            .await
            .map_err(|e| request_error("history response malformed", e))
    }

    /// Recent conversations for the local user, most recent first.
    pub async fn conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, WorklinkError> {
        let url = format!("{}/api/chat/conversations", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(|e| request_error("conversations request failed", e))?
            .error_for_status()
            .map_err(|e| request_error("conversations request rejected", e))?;

        response
            .json()
            .await
            .map_err(|e| request_error("conversations response malformed", e))
    }

    /// Contact suggestions for starting new conversations.
    pub async fn suggestions(&self, user_id: &str) -> Result<Vec<UserSummary>, WorklinkError> {
        let url = format!("{}/api/chat/suggestions", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(|e| request_error("suggestions request failed", e))?
            .error_for_status()
            .map_err(|e| request_error("suggestions request rejected", e))?;

        response
            .json()
            .await
            .map_err(|e| request_error("suggestions response malformed", e))
    }

    /// Global user search across the organization.
    pub async fn search_users(
        &self,
        query: &str,
        current_user_id: &str,
    ) -> Result<Vec<UserSummary>, WorklinkError> {
        let url = format!("{}/api/chat/users", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("query", query), ("currentUserId", current_user_id)])
            .send()
            .await
            .map_err(|e| request_error("user search failed", e))?
            .error_for_status()
            .map_err(|e| request_error("user search rejected", e))?;

        response
            .json()
            .await
            .map_err(|e| request_error("user search response malformed", e))
    }

    /// Marks all messages from `sender_id` to `recipient_id` as read.
    ///
    /// Callers treat this as fire-and-forget; the local UI never blocks on it.
    pub async fn mark_read(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Result<(), WorklinkError> {
        let url = format!("{}/api/chat/read/{sender_id}", self.base_url);
        self.http
            .put(url)
            .query(&[("recipientId", recipient_id)])
            .send()
            .await
            .map_err(|e| request_error("read receipt failed", e))?
            .error_for_status()
            .map_err(|e| request_error("read receipt rejected", e))?;

        debug!(sender_id, recipient_id, "read receipt submitted");
        Ok(())
    }

    /// Total unread message count for the local user (server-derived).
    pub async fn unread_count(&self, user_id: &str) -> Result<u64, WorklinkError> {
        let url = format!("{}/api/chat/unread-count", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(|e| request_error("unread count request failed", e))?
            .error_for_status()
            .map_err(|e| request_error("unread count request rejected", e))?;

        response
            .json()
            .await
            .map_err(|e| request_error("unread count response malformed", e))
    }
}

fn request_error(context: &str, e: reqwest::Error) -> WorklinkError {
    WorklinkError::Request {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}
