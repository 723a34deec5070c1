//! Wire protocol for the streaming and fallback endpoints.
//!
//! The streaming endpoint sends JSON frames tagged by `type`. Frames are
//! decoded into [`ServerFrame`] and then narrowed to the transport-neutral
//! [`StreamEvent`] the assembler consumes. The fallback endpoint speaks a
//! plain request/response pair.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::visitor::VisitorId;

/// Protocol event consumed by the message assembler.
///
/// Both transports produce this same contract: the streaming path decodes it
/// from server frames, the fallback path synthesizes it from the reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text.
    Token { text: String },
    /// The current assistant message is complete.
    Done,
    /// Side-channel tool invocation info.
    Tool { payload: serde_json::Value },
    /// Side-channel tool execution result.
    ToolResult { payload: serde_json::Value },
    /// Exchange-level failure reported by the agent or the fallback path.
    Error { message: String },
    /// End of a full exchange, informational.
    RoundComplete,
}

impl StreamEvent {
    /// Short lowercase label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Token { .. } => "token",
            StreamEvent::Done => "done",
            StreamEvent::Tool { .. } => "tool",
            StreamEvent::ToolResult { .. } => "tool_result",
            StreamEvent::Error { .. } => "error",
            StreamEvent::RoundComplete => "round_complete",
        }
    }
}

/// Frame sent by the server over the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Token {
        data: String,
    },
    Done {
        /// The server echoes the full reply here; the client ignores it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    Tool {
        #[serde(default)]
        data: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        data: serde_json::Value,
    },
    Error {
        #[serde(default)]
        error: String,
    },
    RoundComplete,
}

const KNOWN_FRAME_TYPES: &[&str] = &[
    "token",
    "done",
    "tool",
    "tool_result",
    "error",
    "round_complete",
];

impl ServerFrame {
    /// Decode a text frame.
    ///
    /// Distinguishes an unknown `type` tag from structurally broken JSON so the
    /// caller can log them differently.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ProtocolError::Malformed("missing 'type' field".to_string()))?;

        if !KNOWN_FRAME_TYPES.contains(&kind) {
            return Err(ProtocolError::UnknownType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

impl From<ServerFrame> for StreamEvent {
    fn from(frame: ServerFrame) -> Self {
        match frame {
            ServerFrame::Token { data } => StreamEvent::Token { text: data },
            ServerFrame::Done { .. } => StreamEvent::Done,
            ServerFrame::Tool { data } => StreamEvent::Tool { payload: data },
            ServerFrame::ToolResult { data } => StreamEvent::ToolResult { payload: data },
            ServerFrame::Error { error } => StreamEvent::Error { message: error },
            ServerFrame::RoundComplete => StreamEvent::RoundComplete,
        }
    }
}

/// Frame sent by the client over the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame {
    pub message: String,
}

/// Request body for the fallback endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRequest {
    pub visitor_id: VisitorId,
    pub message: String,
}

/// Response body from the fallback endpoint: the complete assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackResponse {
    pub message: String,
    /// Results of the tools run while producing the reply.
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
}

impl FallbackResponse {
    /// Translate the reply into the same event contract the stream produces.
    ///
    /// The tools have already run by the time the reply arrives, so each one
    /// is reported as a completed tool result.
    pub fn into_events(self) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = self
            .tools
            .into_iter()
            .map(|payload| StreamEvent::ToolResult { payload })
            .collect();
        events.push(StreamEvent::Token { text: self.message });
        events.push(StreamEvent::Done);
        events
    }
}

/// Body of the server's `/health` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub ts: Option<String>,
}
