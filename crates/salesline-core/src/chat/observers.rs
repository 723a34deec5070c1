//! Presentation callbacks registered on a session.

use salesline_types::chat::ConversationMessage;
use salesline_types::connection::ConnectionState;

/// Handle returned by every `on_*` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Tool activity reported by the agent, surfaced for display or logs.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolActivity {
    Invoked(serde_json::Value),
    Completed(serde_json::Value),
}

type MessagesFn = Box<dyn Fn(&[ConversationMessage]) + Send>;
type TypingFn = Box<dyn Fn(bool) + Send>;
type ConnectionFn = Box<dyn Fn(ConnectionState) + Send>;
type ErrorFn = Box<dyn Fn(&str) + Send>;
type ToolFn = Box<dyn Fn(&ToolActivity) + Send>;

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    messages: Vec<(ObserverId, MessagesFn)>,
    typing: Vec<(ObserverId, TypingFn)>,
    connection: Vec<(ObserverId, ConnectionFn)>,
    errors: Vec<(ObserverId, ErrorFn)>,
    tools: Vec<(ObserverId, ToolFn)>,
}

impl Observers {
    fn next_id(&mut self) -> ObserverId {
        self.next_id += 1;
        ObserverId(self.next_id)
    }

    pub fn add_messages(&mut self, f: MessagesFn) -> ObserverId {
        let id = self.next_id();
        self.messages.push((id, f));
        id
    }

    pub fn add_typing(&mut self, f: TypingFn) -> ObserverId {
        let id = self.next_id();
        self.typing.push((id, f));
        id
    }

    pub fn add_connection(&mut self, f: ConnectionFn) -> ObserverId {
        let id = self.next_id();
        self.connection.push((id, f));
        id
    }

    pub fn add_error(&mut self, f: ErrorFn) -> ObserverId {
        let id = self.next_id();
        self.errors.push((id, f));
        id
    }

    pub fn add_tool(&mut self, f: ToolFn) -> ObserverId {
        let id = self.next_id();
        self.tools.push((id, f));
        id
    }

    /// Remove the observer with `id`, whichever kind it is.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.len();
        self.messages.retain(|(i, _)| *i != id);
        self.typing.retain(|(i, _)| *i != id);
        self.connection.retain(|(i, _)| *i != id);
        self.errors.retain(|(i, _)| *i != id);
        self.tools.retain(|(i, _)| *i != id);
        self.len() < before
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.typing.clear();
        self.connection.clear();
        self.errors.clear();
        self.tools.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
            + self.typing.len()
            + self.connection.len()
            + self.errors.len()
            + self.tools.len()
    }

    pub fn messages_changed(&self, messages: &[ConversationMessage]) {
        for (_, f) in &self.messages {
            f(messages);
        }
    }

    pub fn typing_changed(&self, typing: bool) {
        for (_, f) in &self.typing {
            f(typing);
        }
    }

    pub fn connection_changed(&self, state: ConnectionState) {
        for (_, f) in &self.connection {
            f(state);
        }
    }

    pub fn error(&self, message: &str) {
        for (_, f) in &self.errors {
            f(message);
        }
    }

    pub fn tool_activity(&self, activity: &ToolActivity) {
        for (_, f) in &self.tools {
            f(activity);
        }
    }
}
