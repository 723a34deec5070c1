//! Session logic and port definitions for Salesline.
//!
//! This crate defines the "ports" (storage and transport traits) that the
//! infrastructure layer implements, and everything that runs on top of them:
//! identity, history, the message assembler, the transport manager and the
//! session controller. It depends only on `salesline-types` -- never on
//! `salesline-infra` or any database/IO crate.

pub mod chat;
pub mod identity;
pub mod storage;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
