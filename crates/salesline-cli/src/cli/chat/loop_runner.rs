//! Main chat loop orchestration.
//!
//! Starts a session, prints the banner and recent history, then alternates
//! between reading a line and pumping session events until the reply is
//! complete. Observer callbacks only enqueue `UiEvent`s; all printing
//! happens on the loop.

use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;

use salesline_core::chat::ToolActivity;
use salesline_core::storage::prefs::AutoOpenFlag;
use salesline_types::connection::ConnectionState;

use crate::cli::history::tail;
use crate::cli::send::thinking_spinner;
use crate::cli::session::{
    CONNECT_SETTLE, REPLY_TIMEOUT, ReplyOutcome, await_reply, settle_connection, watch_errors,
};
use crate::state::{AppState, ConcreteSession};

use super::banner::{print_compact_banner, print_welcome_banner};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{ChatRenderer, ReplyCursor, connection_label};

/// Messages reprinted when a returning visitor opens the chat.
const RESUME_CONTEXT: usize = 6;

/// Session notifications forwarded from observers to the loop.
#[derive(Debug)]
enum UiEvent {
    Connection(ConnectionState),
    Error(String),
    Tool(ToolActivity),
}

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState, quiet: bool) -> anyhow::Result<()> {
    let mut session = state.start_session().await?;
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    register_observers(&mut session, ui_tx);
    let errors = watch_errors(&mut session);

    let connection = settle_connection(&mut session, CONNECT_SETTLE).await;
    // The banner already shows the settled state.
    while ui_rx.try_recv().is_ok() {}

    let renderer = ChatRenderer::new();
    let first_open = AutoOpenFlag::new(Arc::clone(&state.store))
        .should_auto_open()
        .await;
    let shown = if first_open {
        if !quiet {
            print_welcome_banner(&state.config.server_url, &session.visitor_id(), connection);
        }
        session.messages()
    } else {
        if !quiet {
            print_compact_banner(connection);
        }
        tail(session.messages(), Some(RESUME_CONTEXT))
    };
    for message in shown {
        renderer.print_message(message);
    }

    let (mut input, _writer) = ChatInput::new(connection)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    let mut cursor = ReplyCursor::new(session.messages().len());
    let mut warned_memory_only = false;

    loop {
        // Late replies and reconnects that happened while waiting for input.
        session.drain_pending().await;
        for chunk in cursor.advance(session.messages()) {
            renderer.print_chunk(&chunk);
        }
        flush_ui(&renderer, &mut ui_rx, &mut input);

        match input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(cmd) = commands::parse(&text) {
                    match cmd {
                        ChatCommand::Help => commands::print_help(),
                        ChatCommand::History => {
                            println!();
                            for message in session.messages() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Status => print_status(&session, state),
                        ChatCommand::Clear => match session.clear_history().await {
                            Ok(()) => {
                                input.clear();
                                for message in session.messages() {
                                    renderer.print_message(message);
                                }
                                cursor = ReplyCursor::new(session.messages().len());
                            }
                            Err(e) => renderer.print_error(&format!("Could not clear history: {e}")),
                        },
                        ChatCommand::Exit => {
                            println!("\n  {}", style("Session ended.").dim());
                            break;
                        }
                        ChatCommand::Unknown(name) => {
                            println!(
                                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                                style("?").yellow().bold(),
                                style(name).dim()
                            );
                        }
                    }
                    continue;
                }

                // A close that raced the input prompt must be seen before
                // sending, or the message would go to a dead stream.
                session.drain_pending().await;
                for chunk in cursor.advance(session.messages()) {
                    renderer.print_chunk(&chunk);
                }
                flush_ui(&renderer, &mut ui_rx, &mut input);

                let path = match session.send_message(&text).await {
                    Ok(path) => path,
                    Err(e) => {
                        renderer.print_error(&e.to_string());
                        continue;
                    }
                };
                tracing::debug!(?path, "message handed to transport");

                let baseline = session.messages().len();
                cursor = ReplyCursor::new(baseline);
                let spinner = thinking_spinner();

                let outcome = await_reply(&mut session, baseline, REPLY_TIMEOUT, &errors, |session| {
                    let chunks = cursor.advance(session.messages());
                    if !chunks.is_empty() {
                        spinner.finish_and_clear();
                    }
                    for chunk in &chunks {
                        renderer.print_chunk(chunk);
                    }
                    while let Ok(event) = ui_rx.try_recv() {
                        spinner.finish_and_clear();
                        render_ui_event(&renderer, &mut input, event, false);
                    }
                })
                .await;
                spinner.finish_and_clear();
                if cursor.has_output() {
                    println!();
                    println!();
                }

                match outcome {
                    ReplyOutcome::Completed => {}
                    ReplyOutcome::Failed(error) => {
                        renderer.print_error(&error);
                        println!("  {}", style("Type a message to retry, /exit to quit.").dim());
                    }
                    ReplyOutcome::TimedOut => {
                        println!(
                            "  {}",
                            style("Still waiting on the agent; the reply will show up here.").dim()
                        );
                    }
                    ReplyOutcome::Closed => break,
                }

                if session.is_history_memory_only() && !warned_memory_only {
                    warned_memory_only = true;
                    println!(
                        "  {} {}",
                        style("!").yellow().bold(),
                        style("History can't be saved on this device; it will be lost on exit.").dim()
                    );
                }
            }
        }
    }

    session.close().await;
    Ok(())
}

fn register_observers(session: &mut ConcreteSession, tx: mpsc::UnboundedSender<UiEvent>) {
    let connection_tx = tx.clone();
    session.on_connection_changed(move |state| {
        let _ = connection_tx.send(UiEvent::Connection(state));
    });
    let error_tx = tx.clone();
    session.on_error(move |message| {
        let _ = error_tx.send(UiEvent::Error(message.to_string()));
    });
    session.on_tool_activity(move |activity| {
        let _ = tx.send(UiEvent::Tool(activity.clone()));
    });
}

fn flush_ui(
    renderer: &ChatRenderer,
    rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    input: &mut ChatInput,
) {
    while let Ok(event) = rx.try_recv() {
        render_ui_event(renderer, input, event, true);
    }
}

/// Errors raised while awaiting a reply are reported from the await outcome,
/// so `show_errors` is false there.
fn render_ui_event(
    renderer: &ChatRenderer,
    input: &mut ChatInput,
    event: UiEvent,
    show_errors: bool,
) {
    match event {
        UiEvent::Connection(state) => {
            input.set_connection(state);
            if state != ConnectionState::Connecting {
                renderer.print_connection(state);
            }
        }
        UiEvent::Error(message) if show_errors => renderer.print_error(&message),
        UiEvent::Error(message) => tracing::debug!(error = %message, "session error"),
        UiEvent::Tool(activity) => renderer.print_tool_activity(&activity),
    }
}

fn print_status(session: &ConcreteSession, state: &AppState) {
    let storage = if session.is_history_memory_only() || !state.store.is_durable() {
        "memory only"
    } else {
        "saved on this device"
    };
    println!();
    println!("  {}  {}", style("Visitor:").bold(), style(session.visitor_id()).dim());
    println!("  {}   {}", style("Server:").bold(), style(&state.config.server_url).dim());
    println!("  {}   {}", style("Stream:").bold(), connection_label(session.connection_state()));
    println!("  {}  {}", style("History:").bold(), style(storage).dim());
    println!("  {} {}", style("Messages:").bold(), session.messages().len());
    println!();
}
