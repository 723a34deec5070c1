//! Conversation and message types for Salesline.
//!
//! A conversation is the ordered, append-only list of messages the visitor
//! sees. It is persisted as a whole JSON array of
//! `{sender, text, final, timestamp}` records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Visitor,
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Visitor => write!(f, "visitor"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "visitor" => Ok(Sender::Visitor),
            "assistant" => Ok(Sender::Assistant),
            other => Err(format!("invalid sender: '{other}'")),
        }
    }
}

/// A single message in the visible conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub sender: Sender,
    /// Accumulated display text (partial while an assistant reply streams).
    pub text: String,
    /// True once no further tokens will be appended.
    #[serde(rename = "final")]
    pub is_final: bool,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    /// A visitor message. Visitor messages are always final.
    pub fn visitor(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Visitor,
            text: text.into(),
            is_final: true,
            timestamp: Utc::now(),
        }
    }

    /// A complete assistant message (welcome seed, notices).
    pub fn assistant_final(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            is_final: true,
            timestamp: Utc::now(),
        }
    }

    /// An assistant message that is still receiving tokens.
    pub fn assistant_open(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            is_final: false,
            timestamp: Utc::now(),
        }
    }

    /// Whether this is an assistant message still receiving tokens.
    pub fn is_open_assistant(&self) -> bool {
        self.sender == Sender::Assistant && !self.is_final
    }
}

/// Ordered sequence of messages; insertion order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ConversationMessage>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut ConversationMessage> {
        self.messages.last_mut()
    }

    /// Append a message at the end. The conversation never reorders or removes.
    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    /// Number of assistant messages that are not yet final.
    pub fn open_assistant_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_open_assistant()).count()
    }

    /// Index of the open assistant message, if there is one.
    pub fn open_assistant_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.is_open_assistant())
    }

    /// Mark every open message final, returning how many were closed.
    pub fn finalize_all(&mut self) -> usize {
        let mut closed = 0;
        for message in self.messages.iter_mut().filter(|m| !m.is_final) {
            message.is_final = true;
            closed += 1;
        }
        closed
    }
}
