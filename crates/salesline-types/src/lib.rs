//! Shared domain types for Salesline.
//!
//! Conversation records, visitor identity, the wire protocol spoken with the
//! agent server, connection state, client configuration and the error types
//! shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod visitor;
