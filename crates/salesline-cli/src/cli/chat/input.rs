//! Async readline input handling for the chat loop.
//!
//! Wraps `rustyline_async::Readline` so the loop can await a line, EOF
//! (Ctrl+D) or an interrupt (Ctrl+C). The prompt carries a connection dot.

use console::style;
use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

use salesline_types::connection::ConnectionState;

/// Events produced by the input handler.
#[derive(Debug)]
pub enum InputEvent {
    /// User submitted a line (trimmed).
    Message(String),
    /// End of file (Ctrl+D).
    Eof,
    /// Interrupt signal (Ctrl+C).
    Interrupted,
}

pub struct ChatInput {
    rl: Readline,
    state: ConnectionState,
}

impl ChatInput {
    /// Create the input handler with a prompt for the current connection.
    ///
    /// The returned `SharedWriter` prints without clobbering the prompt.
    pub fn new(state: ConnectionState) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt_for(state))?;
        Ok((Self { rl, state }, stdout))
    }

    /// Redraw the prompt if the connection state changed.
    pub fn set_connection(&mut self, state: ConnectionState) {
        if self.state != state {
            self.state = state;
            let _ = self.rl.update_prompt(&prompt_for(state));
        }
    }

    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    self.rl.add_history_entry(trimmed.clone());
                }
                InputEvent::Message(trimmed)
            }
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(e) => {
                tracing::debug!(error = %e, "readline failed, treating as EOF");
                InputEvent::Eof
            }
        }
    }

    /// Clear the terminal screen.
    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }
}

/// Prompt text: a state dot followed by `You >`.
pub fn prompt_for(state: ConnectionState) -> String {
    let dot = match state {
        ConnectionState::Connected => style("●").green(),
        ConnectionState::Connecting | ConnectionState::Degraded => style("●").yellow(),
        ConnectionState::Disconnected => style("○").dim(),
    };
    format!("  {} {} ", dot, style("You >").green().bold())
}
