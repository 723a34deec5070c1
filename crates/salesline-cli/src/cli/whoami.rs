//! Print the device's visitor id.

use std::sync::Arc;

use anyhow::Result;
use console::style;

use salesline_core::identity::IdentityStore;

use crate::state::AppState;

/// Show the visitor id, creating and storing one on first use.
pub async fn whoami(state: &AppState, json: bool) -> Result<()> {
    let visitor_id = IdentityStore::new(Arc::clone(&state.store))
        .get_or_create_visitor_id()
        .await;

    if json {
        let output = serde_json::json!({
            "visitor_id": visitor_id.to_string(),
            "persistent": state.store.is_durable(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{visitor_id}");
    if !state.store.is_durable() {
        eprintln!(
            "  {} device storage unavailable; this id lasts until exit",
            style("!").yellow().bold()
        );
    }
    Ok(())
}
