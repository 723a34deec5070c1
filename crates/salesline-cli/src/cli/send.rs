//! One-shot send: deliver a single message and print the reply.

use std::time::Duration;

use anyhow::{Result, bail};
use console::style;

use salesline_types::connection::DeliveryPath;

use crate::state::AppState;

use super::session::{
    CONNECT_SETTLE, REPLY_TIMEOUT, ReplyOutcome, await_reply, reply_text, settle_connection,
    watch_errors,
};

/// Send `text` as the visitor and wait for the complete reply.
///
/// # Examples
///
/// ```bash
/// salesline send "I need a mobile app for my gym"
/// salesline send --json "What does a web shop cost?"
/// ```
pub async fn send_once(
    state: &AppState,
    text: &str,
    timeout_secs: Option<u64>,
    json: bool,
) -> Result<()> {
    let limit = timeout_secs.map(Duration::from_secs).unwrap_or(REPLY_TIMEOUT);

    let mut session = state.start_session().await?;
    let errors = watch_errors(&mut session);
    let connection = settle_connection(&mut session, CONNECT_SETTLE).await;
    tracing::debug!(connection = %connection, "connection settled before send");

    let path = match session.send_message(text).await {
        Ok(path) => path,
        Err(e) => {
            session.close().await;
            bail!("cannot send message: {e}");
        }
    };
    let baseline = session.messages().len();

    let spinner = (!json).then(thinking_spinner);
    let outcome = await_reply(&mut session, baseline, limit, &errors, |_| {}).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let reply = reply_text(session.messages(), baseline);
    let visitor_id = session.visitor_id();
    session.close().await;

    match outcome {
        ReplyOutcome::Completed => {}
        ReplyOutcome::Failed(error) => bail!("agent error: {error}"),
        ReplyOutcome::TimedOut => bail!("no complete reply within {}s", limit.as_secs()),
        ReplyOutcome::Closed => bail!("session closed before the reply arrived"),
    }

    if json {
        let output = serde_json::json!({
            "visitor_id": visitor_id.to_string(),
            "path": path_label(path),
            "reply": reply,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!();
        println!("  {} {}", style("Agent >").cyan().bold(), reply.trim());
        println!();
    }

    Ok(())
}

pub(crate) fn thinking_spinner() -> indicatif::ProgressBar {
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub(crate) fn path_label(path: DeliveryPath) -> &'static str {
    match path {
        DeliveryPath::Stream => "stream",
        DeliveryPath::Fallback => "fallback",
    }
}
