// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as URL schemes and non-zero intervals.

use crate::diagnostic::ConfigError;
use crate::model::WorklinkConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WorklinkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.api.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "api.base_url must not be empty".to_string(),
        });
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("api.base_url `{base_url}` must use the http or https scheme"),
        });
    }

    if config.api.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "api.timeout_secs must be at least 1".to_string(),
        });
    }

    let broker_url = config.broker.url.trim();
    if broker_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "broker.url must not be empty".to_string(),
        });
    } else if !broker_url.starts_with("ws://") && !broker_url.starts_with("wss://") {
        errors.push(ConfigError::Validation {
            message: format!("broker.url `{broker_url}` must use the ws or wss scheme"),
        });
    }

    if config.broker.heartbeat_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "broker.heartbeat_secs must be at least 1".to_string(),
        });
    }

    if config.broker.reconnect_delay_ms < 100 {
        errors.push(ConfigError::Validation {
            message: format!(
                "broker.reconnect_delay_ms must be at least 100, got {}",
                config.broker.reconnect_delay_ms
            ),
        });
    }

    if config.chat.typing_quiet_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "chat.typing_quiet_secs must be at least 1".to_string(),
        });
    }

    // A stale-clear shorter than the quiet period would flicker the remote
    // typing indicator off while the sender is still typing.
    if config.chat.typing_stale_secs < config.chat.typing_quiet_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "chat.typing_stale_secs ({}) must not be shorter than chat.typing_quiet_secs ({})",
                config.chat.typing_stale_secs, config.chat.typing_quiet_secs
            ),
        });
    }

    if config.chat.refresh_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "chat.refresh_interval_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
