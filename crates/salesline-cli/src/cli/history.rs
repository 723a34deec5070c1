//! Stored conversation commands: show, reset.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

use salesline_core::storage::history::HistoryStore;
use salesline_types::chat::ConversationMessage;

use crate::state::AppState;

use super::chat::renderer::ChatRenderer;

/// Print the stored conversation, optionally only the last `limit` messages.
///
/// # Examples
///
/// ```bash
/// salesline history show
/// salesline history show --limit 10 --json
/// ```
pub async fn show_history(state: &AppState, limit: Option<usize>, json: bool) -> Result<()> {
    let mut history =
        HistoryStore::new(Arc::clone(&state.store), state.config.welcome_message.clone());
    let conversation = history.load().await;
    let messages = tail(conversation.messages(), limit);

    if json {
        println!("{}", serde_json::to_string_pretty(messages)?);
        return Ok(());
    }

    let renderer = ChatRenderer::new();
    println!();
    for message in messages {
        renderer.print_message(message);
    }
    if messages.len() < conversation.len() {
        println!(
            "  {}",
            style(format!(
                "showing {} of {} messages",
                messages.len(),
                conversation.len()
            ))
            .dim()
        );
        println!();
    }

    Ok(())
}

/// Delete the stored conversation. The next session starts from the welcome
/// message; the visitor id is kept.
pub async fn reset_history(state: &AppState, json: bool) -> Result<()> {
    let mut history =
        HistoryStore::new(Arc::clone(&state.store), state.config.welcome_message.clone());
    history
        .reset()
        .await
        .context("failed to delete stored conversation")?;

    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("  {} Conversation history cleared.", style("x").red().bold());
    }
    Ok(())
}

pub(crate) fn tail(messages: &[ConversationMessage], limit: Option<usize>) -> &[ConversationMessage] {
    match limit {
        Some(limit) if limit < messages.len() => &messages[messages.len() - limit..],
        _ => messages,
    }
}
