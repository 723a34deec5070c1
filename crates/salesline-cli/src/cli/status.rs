//! Status dashboard command.

use std::sync::Arc;

use anyhow::Result;
use console::style;

use salesline_core::identity::IdentityStore;
use salesline_core::storage::history::HistoryStore;

use crate::state::AppState;

/// Display the status dashboard.
///
/// Shows the visitor id, stored history, storage mode and whether the agent
/// server answers its health probe.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let visitor_id = IdentityStore::new(Arc::clone(&state.store))
        .get_or_create_visitor_id()
        .await;
    let conversation =
        HistoryStore::new(Arc::clone(&state.store), state.config.welcome_message.clone())
            .load()
            .await;

    let health = match state.fallback_client() {
        Ok(client) => client.health().await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    let (server_ok, server_detail) = match &health {
        Ok(health) => (health.status == "ok", health.status.clone()),
        Err(e) => (false, e.clone()),
    };

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "visitor_id": visitor_id.to_string(),
            "messages": conversation.len(),
            "durable_storage": state.store.is_durable(),
            "server": {
                "url": state.config.server_url,
                "stream": state.config.stream_endpoint(&visitor_id),
                "healthy": server_ok,
                "detail": server_detail,
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Salesline v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Visitor ──").dim());
    println!("  Id:       {}", style(visitor_id).cyan());
    println!("  Messages: {}", style(conversation.len()).bold());
    println!();

    println!("  {}", style("── Server ──").dim());
    println!("  Url:    {}", state.config.server_url);
    println!(
        "  Stream: {}",
        style(state.config.stream_endpoint(&visitor_id)).dim()
    );
    let health_line = if server_ok {
        format!("{}", style("reachable").green())
    } else {
        format!("{} ({})", style("unreachable").red(), server_detail)
    };
    println!("  Health: {health_line}");
    println!();

    println!("  {}", style("── System ──").dim());
    println!(
        "  Data dir: {}",
        style(state.data_dir.display()).dim()
    );
    let storage = if state.store.is_durable() {
        "SQLite (WAL mode)"
    } else {
        "memory only"
    };
    println!("  Storage:  {}", style(storage).dim());
    println!();

    Ok(())
}
