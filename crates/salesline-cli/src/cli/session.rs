//! Helpers for driving a session from a command handler.
//!
//! The session controller only applies transport events when asked; these
//! helpers pump `next_event` until a condition holds or a deadline passes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use salesline_types::chat::{ConversationMessage, Sender};
use salesline_types::connection::ConnectionState;

use crate::state::ConcreteSession;

/// How long to let the stream finish opening before the first send.
pub const CONNECT_SETTLE: Duration = Duration::from_secs(3);

/// Default wait for a complete reply.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(90);

/// Last error reported by the session's error observer.
pub type ErrorSlot = Arc<Mutex<Option<String>>>;

/// How waiting for a reply ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Completed,
    Failed(String),
    TimedOut,
    Closed,
}

/// Register an error observer that records the most recent error.
pub fn watch_errors(session: &mut ConcreteSession) -> ErrorSlot {
    let slot: ErrorSlot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    session.on_error(move |message| {
        if let Ok(mut last) = sink.lock() {
            *last = Some(message.to_string());
        }
    });
    slot
}

fn take_error(slot: &ErrorSlot) -> Option<String> {
    slot.lock().ok().and_then(|mut last| last.take())
}

/// Apply events while the stream is still opening, up to `wait`.
pub async fn settle_connection(session: &mut ConcreteSession, wait: Duration) -> ConnectionState {
    let deadline = Instant::now() + wait;
    while session.connection_state() == ConnectionState::Connecting {
        match tokio::time::timeout_at(deadline, session.next_event()).await {
            Ok(true) => {}
            Ok(false) | Err(_) => break,
        }
    }
    session.connection_state()
}

/// Pump events until the reply to the message before `baseline` is complete.
///
/// `after_event` runs after every applied event so callers can render
/// partial output as it streams.
pub async fn await_reply(
    session: &mut ConcreteSession,
    baseline: usize,
    limit: Duration,
    errors: &ErrorSlot,
    mut after_event: impl FnMut(&ConcreteSession),
) -> ReplyOutcome {
    take_error(errors);
    let deadline = Instant::now() + limit;

    loop {
        if let Some(error) = take_error(errors) {
            return ReplyOutcome::Failed(error);
        }
        if reply_complete(session.messages(), baseline, session.is_typing()) {
            return ReplyOutcome::Completed;
        }

        match tokio::time::timeout_at(deadline, session.next_event()).await {
            Ok(true) => after_event(session),
            Ok(false) => return ReplyOutcome::Closed,
            Err(_) => {
                tracing::debug!(baseline, "timed out waiting for reply");
                return ReplyOutcome::TimedOut;
            }
        }
    }
}

/// A reply is complete once typing has stopped and a final assistant message
/// follows the visitor's message.
pub fn reply_complete(messages: &[ConversationMessage], baseline: usize, typing: bool) -> bool {
    !typing && latest_reply(messages, baseline).is_some_and(|m| m.is_final)
}

/// The newest assistant message at or after `baseline`.
pub fn latest_reply(messages: &[ConversationMessage], baseline: usize) -> Option<&ConversationMessage> {
    messages
        .get(baseline..)?
        .iter()
        .rev()
        .find(|m| m.sender == Sender::Assistant)
}

/// Concatenated text of every assistant message after `baseline`.
pub fn reply_text(messages: &[ConversationMessage], baseline: usize) -> String {
    messages
        .get(baseline..)
        .unwrap_or_default()
        .iter()
        .filter(|m| m.sender == Sender::Assistant)
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
