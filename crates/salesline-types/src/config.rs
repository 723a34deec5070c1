//! Client configuration types for Salesline.
//!
//! `ClientConfig` represents `config.toml` in the data directory. Every field
//! has a default, so an empty or missing file yields a working client that
//! talks to a local agent server.

use serde::{Deserialize, Serialize};

use crate::visitor::VisitorId;

/// Default greeting seeded into a fresh conversation.
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hi there! I'm the AccellionX assistant. What type of project are you looking to build?";

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base HTTP URL of the agent server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Base WebSocket URL. Derived from `server_url` when unset.
    #[serde(default)]
    pub stream_url: Option<String>,

    /// Path prefix of the streaming endpoint; the visitor id is appended.
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Path of the request/response fallback endpoint.
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,

    /// Path of the server health endpoint.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Timeout for a single fallback request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Greeting seeded into a fresh conversation.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// Reconnect policy for the streaming connection.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Bounded exponential backoff for reopening the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Consecutive reopen attempts before giving up until the next send.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first reopen attempt.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Growth factor applied per attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_stream_path() -> String {
    "/ws/chat".to_string()
}

fn default_fallback_path() -> String {
    "/api/v1/chat".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            stream_url: None,
            stream_path: default_stream_path(),
            fallback_path: default_fallback_path(),
            health_path: default_health_path(),
            request_timeout_secs: default_request_timeout_secs(),
            welcome_message: default_welcome_message(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl ClientConfig {
    /// Base URL of the streaming endpoint (`ws://` or `wss://`).
    pub fn stream_base(&self) -> String {
        if let Some(url) = &self.stream_url {
            return url.trim_end_matches('/').to_string();
        }
        let base = self.server_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        }
    }

    /// Full streaming URL for a visitor: `{stream_base}{stream_path}/{visitor_id}`.
    pub fn stream_endpoint(&self, visitor_id: &VisitorId) -> String {
        format!(
            "{}{}/{}",
            self.stream_base(),
            self.stream_path.trim_end_matches('/'),
            visitor_id
        )
    }

    pub fn fallback_endpoint(&self) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), self.fallback_path)
    }

    pub fn health_endpoint(&self) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), self.health_path)
    }
}
