//! Infrastructure layer for Salesline.
//!
//! Contains implementations of the ports defined in `salesline-core`:
//! SQLite device storage, the WebSocket stream connector and the HTTP
//! fallback client, plus config loading and data directory resolution.

pub mod config;
pub mod filesystem;
pub mod sqlite;
pub mod transport;
