// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Worklink chat client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Worklink configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorklinkConfig {
    /// Local client identity and logging settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// REST backend settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Broker (WebSocket) transport settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Chat behavior tuning.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Local client identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Identifier of the locally authenticated user. Required by the CLI;
    /// library consumers pass the user id explicitly instead.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// REST backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `http://localhost:8080`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer credential sent on every REST call.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Broker (WebSocket) transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:8080/ws`. The local user id
    /// is appended as a `userId` query parameter during the handshake.
    #[serde(default = "default_broker_url")]
    pub url: String,

    /// Heartbeat ping interval in seconds, both directions.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Fixed delay between reconnect attempts, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            heartbeat_secs: default_heartbeat_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

fn default_broker_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_heartbeat_secs() -> u64 {
    4
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

/// Chat behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Quiet period after the last keystroke before a typing=false signal
    /// is emitted, in seconds.
    #[serde(default = "default_typing_quiet_secs")]
    pub typing_quiet_secs: u64,

    /// Safety timeout after which a remote typing indicator is considered
    /// stale and cleared locally, in seconds. Bounds staleness if the
    /// sender's false-signal is lost.
    #[serde(default = "default_typing_stale_secs")]
    pub typing_stale_secs: u64,

    /// Interval for polling the conversation and suggestion lists, in seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_quiet_secs: default_typing_quiet_secs(),
            typing_stale_secs: default_typing_stale_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

fn default_typing_quiet_secs() -> u64 {
    3
}

fn default_typing_stale_secs() -> u64 {
    6
}

fn default_refresh_interval_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = WorklinkConfig::default();
        assert!(config.client.user_id.is_none());
        assert_eq!(config.client.log_level, "info");
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.broker.url, "ws://localhost:8080/ws");
        assert_eq!(config.broker.heartbeat_secs, 4);
        assert_eq!(config.broker.reconnect_delay_ms, 2000);
        assert_eq!(config.chat.typing_quiet_secs, 3);
        assert_eq!(config.chat.typing_stale_secs, 6);
        assert_eq!(config.chat.refresh_interval_secs, 10);
    }

    #[test]
    fn partial_section_fills_remaining_defaults() {
        let toml_str = r#"
[broker]
reconnect_delay_ms = 500
"#;
        let config: WorklinkConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.broker.reconnect_delay_ms, 500);
        assert_eq!(config.broker.heartbeat_secs, 4);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[chat]
typing_quiet_seconds = 3
"#;
        assert!(toml::from_str::<WorklinkConfig>(toml_str).is_err());
    }
}
