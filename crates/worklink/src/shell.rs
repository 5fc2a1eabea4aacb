// SPDX-FileCopyrightText: 2026 Worklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `worklink shell` command implementation.
//!
//! Launches an interactive chat REPL with readline history and colored
//! output. One broker connection is opened for the whole session; switching
//! conversations swaps router callbacks instead of reconnecting.
//!
//! Commands: `/to <user-id>` switches the active conversation, `/list`
//! prints the polled conversation list, `/quit` exits. Everything else is
//! sent as a chat message to the active recipient.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::broadcast;

use worklink_api::ChatApi;
use worklink_config::WorklinkConfig;
use worklink_core::error::WorklinkError;
use worklink_core::traits::Transport;
use worklink_session::{ChatSession, ListRefresher, SessionEvent};
use worklink_transport::router::SubscriptionRouter;
use worklink_transport::WsTransport;

/// Runs the `worklink shell` interactive REPL.
pub async fn run_shell(
    config: WorklinkConfig,
    user_id: String,
    recipient: Option<String>,
) -> Result<(), WorklinkError> {
    let router = Arc::new(SubscriptionRouter::new());
    let transport: Arc<dyn Transport> = Arc::new(WsTransport::new(
        user_id.clone(),
        config.broker.clone(),
        Arc::clone(&router),
    )?);
    let api = ChatApi::new(&config.api)?;

    let session = ChatSession::new(
        user_id.clone(),
        transport,
        router,
        api.clone(),
        config.chat.clone(),
    );
    session.start().await?;

    let refresher = ListRefresher::spawn(
        api,
        user_id.clone(),
        Duration::from_secs(config.chat.refresh_interval_secs),
    );

    // Print inbound activity as it arrives.
    let printer_session = session.clone();
    let mut events = session.events();
    let printer = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event {
                SessionEvent::MessageReceived(msg) => {
                    let active = printer_session.active_recipient();
                    if active.as_deref() == Some(msg.sender_id.as_str()) {
                        println!(
                            "\r{} {} {}",
                            msg.timestamp.format("%H:%M").to_string().dimmed(),
                            format!("{}:", msg.sender_id).cyan().bold(),
                            msg.content
                        );
                    } else {
                        println!(
                            "\r{}",
                            format!("(new message from {})", msg.sender_id).dimmed()
                        );
                    }
                }
                SessionEvent::TypingChanged { user_id, is_typing } => {
                    let active = printer_session.active_recipient();
                    if is_typing && active.as_deref() == Some(user_id.as_str()) {
                        println!("\r{}", format!("{user_id} is typing...").dimmed());
                    }
                }
                SessionEvent::Connected => {
                    println!("\r{}", "connected".green());
                }
                SessionEvent::TransportError(message) => {
                    eprintln!("\r{}: {message}", "transport".red());
                }
            }
        }
    });

    println!(
        "{} connected as {}. /to <user-id> to pick a conversation, /quit to exit",
        "worklink".bold(),
        user_id.cyan()
    );

    if let Some(recipient) = recipient {
        open_conversation(&session, &recipient);
    }

    let mut editor = DefaultEditor::new()
        .map_err(|e| WorklinkError::Internal(format!("readline init failed: {e}")))?;

    loop {
        let prompt = match session.active_recipient() {
            Some(recipient) => format!("{user_id} -> {recipient} > "),
            None => format!("{user_id} > "),
        };

        match editor.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);

                if let Some(target) = trimmed.strip_prefix("/to ") {
                    open_conversation(&session, target.trim());
                    continue;
                }
                match trimmed {
                    "/quit" | "/exit" => break,
                    "/list" => {
                        print_conversations(&refresher);
                        continue;
                    }
                    _ => {}
                }

                if session.active_recipient().is_none() {
                    eprintln!(
                        "{}",
                        "pick a conversation first: /to <user-id>".yellow()
                    );
                    continue;
                }

                if let Err(e) = session.send_message(trimmed).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    refresher.shutdown();
    printer.abort();
    session.shutdown().await?;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Switches the active conversation and acknowledges its unread messages.
fn open_conversation(session: &ChatSession, recipient: &str) {
    session.set_active_recipient(recipient);
    session.mark_as_read();
    println!("{}", format!("conversation with {recipient} opened").dimmed());
}

fn print_conversations(refresher: &ListRefresher) {
    let conversations = refresher.conversations();
    if conversations.is_empty() {
        println!("{}", "no recent conversations".dimmed());
        return;
    }
    for conversation in conversations {
        let unread = if conversation.unread_count > 0 {
            format!(" ({} unread)", conversation.unread_count)
                .yellow()
                .to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {}{}",
            conversation.user_id.cyan(),
            conversation.user_name,
            unread
        );
    }
}
