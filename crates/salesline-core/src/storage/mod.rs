//! Device-local storage for Salesline.
//!
//! Defines the key-value port, an in-memory implementation, and the stores
//! built on top of it (conversation history and the auto-open flag).
//! The durable implementation lives in salesline-infra.

pub mod history;
pub mod kv_store;
pub mod memory;
pub mod prefs;

/// Record holding the visitor identifier.
pub const VISITOR_ID_KEY: &str = "salesline.visitor_id";

/// Record holding the serialized conversation.
pub const CONVERSATION_KEY: &str = "salesline.conversation";

/// Record marking that the chat was presented automatically once.
pub const AUTO_OPENED_KEY: &str = "salesline.auto_opened";
