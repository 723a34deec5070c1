//! Reconstruction of streamed assistant replies.
//!
//! Pure state machine over a [`Conversation`]: tokens append to the open
//! assistant message (or open a new one), `done` and `error` finalize it.
//! At most one assistant message is open at any time, and the typing
//! indicator is exactly "an open assistant message exists".

use salesline_types::chat::{Conversation, ConversationMessage};
use salesline_types::protocol::StreamEvent;

/// Outcome of applying one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// The conversation changed and must be persisted and announced.
    pub mutated: bool,
    /// Typing indicator after the event.
    pub typing: bool,
    /// Exchange-level error to surface separately from message text.
    pub error: Option<String>,
}

pub struct MessageAssembler;

impl MessageAssembler {
    pub fn apply(conversation: &mut Conversation, event: StreamEvent) -> Applied {
        let mut applied = Applied::default();

        match event {
            StreamEvent::Token { text } => {
                let appended = match conversation.last_mut() {
                    Some(last) if last.is_open_assistant() => {
                        last.text.push_str(&text);
                        true
                    }
                    _ => false,
                };
                if !appended {
                    // Seal any older open message so only the new one is open.
                    let sealed = conversation.finalize_all();
                    if sealed > 0 {
                        tracing::debug!(sealed, "sealed open message interrupted by new reply");
                    }
                    conversation.push(ConversationMessage::assistant_open(text));
                }
                applied.mutated = true;
            }
            StreamEvent::Done => {
                if conversation.finalize_all() > 0 {
                    applied.mutated = true;
                } else {
                    tracing::debug!("done received with no pending assistant message");
                }
            }
            StreamEvent::Error { message } => {
                applied.mutated = conversation.finalize_all() > 0;
                applied.error = Some(message);
            }
            StreamEvent::Tool { .. } | StreamEvent::ToolResult { .. } | StreamEvent::RoundComplete => {}
        }

        applied.typing = Self::is_typing(conversation);
        applied
    }

    /// Finalize a message left open when its stream dropped.
    pub fn seal_open(conversation: &mut Conversation) -> bool {
        conversation.finalize_all() > 0
    }

    pub fn is_typing(conversation: &Conversation) -> bool {
        conversation.open_assistant_index().is_some()
    }
}
