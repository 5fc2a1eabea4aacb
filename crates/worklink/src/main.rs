// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worklink - real-time chat client for the Worklink HR platform.
//!
//! This is the binary entry point for the chat CLI.

mod shell;
mod status;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use worklink_config::WorklinkConfig;

/// Worklink - real-time chat client for the Worklink HR platform.
#[derive(Parser, Debug)]
#[command(name = "worklink", version, about, long_about = None)]
struct Cli {
    /// Local user id; overrides client.user_id from the config.
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive chat session.
    Shell {
        /// Recipient to open on startup.
        #[arg(long)]
        recipient: Option<String>,
    },
    /// Show backend and broker connectivity diagnostics.
    Status {
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
}

/// Resolves the local user id: CLI flag first, then client.user_id.
fn resolve_user(flag: Option<String>, config: &WorklinkConfig) -> Option<String> {
    flag.or_else(|| config.client.user_id.clone())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match worklink_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            worklink_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.client.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(user_id) = resolve_user(cli.user, &config) else {
        eprintln!("error: a user id is required. Pass --user or set client.user_id in worklink.toml");
        std::process::exit(1);
    };

    let result = match cli.command {
        Some(Commands::Shell { recipient }) => shell::run_shell(config, user_id, recipient).await,
        Some(Commands::Status { json }) => status::run_status(&config, &user_id, json).await,
        None => shell::run_shell(config, user_id, None).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = worklink_config::load_and_validate_str("").expect("defaults should be valid");
        assert_eq!(config.broker.heartbeat_secs, 4);
    }

    #[test]
    fn user_flag_overrides_config() {
        let config =
            worklink_config::load_and_validate_str("[client]\nuser_id = \"42\"\n").unwrap();
        assert_eq!(
            resolve_user(Some("7".into()), &config).as_deref(),
            Some("7")
        );
        assert_eq!(resolve_user(None, &config).as_deref(), Some("42"));
    }

    #[test]
    fn missing_user_resolves_to_none() {
        let config = worklink_config::load_and_validate_str("").unwrap();
        assert!(resolve_user(None, &config).is_none());
    }
}
