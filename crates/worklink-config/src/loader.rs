// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./worklink.toml` > `~/.config/worklink/worklink.toml`
//! > `/etc/worklink/worklink.toml` with environment variable overrides via
//! `WORKLINK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WorklinkConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/worklink/worklink.toml` (system-wide)
/// 3. `~/.config/worklink/worklink.toml` (user XDG config)
/// 4. `./worklink.toml` (local directory)
/// 5. `WORKLINK_*` environment variables
pub fn load_config() -> Result<WorklinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WorklinkConfig::default()))
        .merge(Toml::file("/etc/worklink/worklink.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("worklink/worklink.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("worklink.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Useful for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WorklinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WorklinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WorklinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WorklinkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WORKLINK_BROKER_RECONNECT_DELAY_MS`
/// must map to `broker.reconnect_delay_ms`, not `broker.reconnect.delay.ms`.
fn env_provider() -> Env {
    Env::prefixed("WORKLINK_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: WORKLINK_BROKER_URL -> "broker_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("client_", "client.", 1)
            .replacen("api_", "api.", 1)
            .replacen("broker_", "broker.", 1)
            .replacen("chat_", "chat.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_loader_applies_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
    }

    #[test]
    fn string_loader_merges_over_defaults() {
        let config = load_config_from_str(
            r#"
[api]
base_url = "https://hr.example.com"

[client]
user_id = "42"
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://hr.example.com");
        assert_eq!(config.client.user_id.as_deref(), Some("42"));
        // Untouched sections keep defaults.
        assert_eq!(config.broker.heartbeat_secs, 4);
    }
}
