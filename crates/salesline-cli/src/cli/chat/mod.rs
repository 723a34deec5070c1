//! Interactive terminal chat with the sales agent.
//!
//! Streams replies as they arrive, shows tool activity and connection
//! changes, and offers slash commands. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
