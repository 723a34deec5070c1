//! Terminal rendering for the chat loop.
//!
//! `ChatRenderer` uses `termimad` for complete messages (welcome, history).
//! Streaming replies are printed raw as they grow; `ReplyCursor` tracks how
//! much of each assistant message has already been written.

use std::io::Write;

use console::style;
use termimad::MadSkin;

use salesline_core::chat::ToolActivity;
use salesline_types::chat::{ConversationMessage, Sender};
use salesline_types::connection::ConnectionState;

/// Label printed before assistant output.
pub const AGENT_LABEL: &str = "Agent";

/// Terminal markdown renderer.
pub struct ChatRenderer {
    skin: MadSkin,
}

impl ChatRenderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.bold.set_fg(termimad::crossterm::style::Color::Cyan);
        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);
        Self { skin }
    }

    /// Render complete markdown text for the terminal.
    pub fn render_markdown(&self, markdown: &str) -> String {
        self.skin.term_text(markdown).to_string()
    }

    /// Print a complete message with its sender label.
    pub fn print_message(&self, message: &ConversationMessage) {
        let label = match message.sender {
            Sender::Visitor => format!("{}", style("You").green().bold()),
            Sender::Assistant => format!("{}", style(AGENT_LABEL).cyan().bold()),
        };
        let time = message.timestamp.format("%H:%M");
        println!("  {} {}", label, style(time).dim());
        for line in self.render_markdown(&message.text).trim_end().lines() {
            println!("  {line}");
        }
        println!();
    }

    /// Print a streamed reply chunk (raw, no formatting).
    pub fn print_chunk(&self, chunk: &ReplyChunk) {
        match chunk {
            ReplyChunk::Start(text) => {
                print!("\n  {} {text}", style(format!("{AGENT_LABEL} >")).cyan().bold());
            }
            ReplyChunk::Continue(text) => print!("{text}"),
        }
        let _ = std::io::stdout().flush();
    }

    pub fn print_tool_activity(&self, activity: &ToolActivity) {
        let line = match activity {
            ToolActivity::Invoked(payload) => format!("using {}", tool_name(payload)),
            ToolActivity::Completed(payload) => format!("{} finished", tool_name(payload)),
        };
        println!("\n  {} {}", style("~").magenta(), style(line).dim());
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("\n  {} {message}", style("!").red().bold());
    }

    pub fn print_connection(&self, state: ConnectionState) {
        println!("  {} {}", style("·").dim(), connection_label(state));
    }
}

impl Default for ChatRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// A piece of streamed assistant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyChunk {
    /// First text of a new assistant message.
    Start(String),
    /// More text for the message already being printed.
    Continue(String),
}

/// Tracks how much streamed assistant text has been printed.
///
/// Only the last message of a conversation can still grow, so once a later
/// message appears the cursor moves on for good.
#[derive(Debug)]
pub struct ReplyCursor {
    index: usize,
    printed: usize,
    started: bool,
    emitted: bool,
}

impl ReplyCursor {
    /// Start printing from message `baseline` onward.
    pub fn new(baseline: usize) -> Self {
        Self {
            index: baseline,
            printed: 0,
            started: false,
            emitted: false,
        }
    }

    /// Whether any assistant text has been emitted.
    pub fn has_output(&self) -> bool {
        self.emitted
    }

    /// Collect everything not yet printed.
    pub fn advance(&mut self, messages: &[ConversationMessage]) -> Vec<ReplyChunk> {
        let mut chunks = Vec::new();
        while let Some(message) = messages.get(self.index) {
            if message.sender == Sender::Assistant {
                let fresh = message.text.get(self.printed..).unwrap_or_default();
                if !self.started {
                    chunks.push(ReplyChunk::Start(fresh.to_string()));
                    self.started = true;
                } else if !fresh.is_empty() {
                    chunks.push(ReplyChunk::Continue(fresh.to_string()));
                }
                self.printed = message.text.len();
            }

            if self.index + 1 >= messages.len() {
                break;
            }
            self.index += 1;
            self.printed = 0;
            self.started = false;
        }
        self.emitted |= !chunks.is_empty();
        chunks
    }
}

/// Human-readable connection state.
pub fn connection_label(state: ConnectionState) -> String {
    match state {
        ConnectionState::Connected => format!("{}", style("live").green()),
        ConnectionState::Connecting => format!("{}", style("connecting").yellow()),
        ConnectionState::Degraded => format!("{}", style("degraded").yellow()),
        ConnectionState::Disconnected => format!("{}", style("offline").dim()),
    }
}

fn tool_name(payload: &serde_json::Value) -> String {
    payload
        .get("name")
        .or_else(|| payload.get("tool"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "a tool".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_streams_deltas() {
        let mut messages = vec![ConversationMessage::visitor("hi")];
        let mut cursor = ReplyCursor::new(1);
        assert!(cursor.advance(&messages).is_empty());
        assert!(!cursor.has_output());

        messages.push(ConversationMessage::assistant_open("Hel"));
        assert_eq!(
            cursor.advance(&messages),
            vec![ReplyChunk::Start("Hel".to_string())]
        );

        messages[1].text.push_str("lo");
        assert_eq!(
            cursor.advance(&messages),
            vec![ReplyChunk::Continue("lo".to_string())]
        );

        messages[1].is_final = true;
        assert!(cursor.advance(&messages).is_empty());
        assert!(cursor.has_output());
    }

    #[test]
    fn test_cursor_moves_to_next_message() {
        let mut messages = vec![
            ConversationMessage::visitor("hi"),
            ConversationMessage::assistant_open("Part one"),
        ];
        let mut cursor = ReplyCursor::new(1);
        cursor.advance(&messages);

        messages[1].text.push_str(".");
        messages[1].is_final = true;
        messages.push(ConversationMessage::assistant_final("Notice"));
        assert_eq!(
            cursor.advance(&messages),
            vec![
                ReplyChunk::Continue(".".to_string()),
                ReplyChunk::Start("Notice".to_string()),
            ]
        );
    }

    #[test]
    fn test_cursor_skips_visitor_messages() {
        let messages = vec![
            ConversationMessage::visitor("hi"),
            ConversationMessage::assistant_final("Reply"),
        ];
        let mut cursor = ReplyCursor::new(0);
        assert_eq!(
            cursor.advance(&messages),
            vec![ReplyChunk::Start("Reply".to_string())]
        );
    }

    #[test]
    fn test_tool_name_from_payload() {
        assert_eq!(
            tool_name(&serde_json::json!({"name": "estimate_cost"})),
            "estimate_cost"
        );
        assert_eq!(tool_name(&serde_json::json!({"tool": "lookup"})), "lookup");
        assert_eq!(tool_name(&serde_json::json!(42)), "a tool");
    }
}
