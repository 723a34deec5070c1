//! CLI command definitions and dispatch for the `salesline` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod history;
pub mod send;
pub mod session;
pub mod status;
pub mod whoami;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Chat with the sales agent from your terminal.
#[derive(Parser)]
#[command(name = "salesline", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Agent server base URL (overrides config.toml).
    #[arg(long, global = true, env = "SALESLINE_SERVER_URL")]
    pub server: Option<String>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat with the agent.
    Chat,

    /// Send one message and print the agent's reply.
    Send {
        /// Message text.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Seconds to wait for the complete reply.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Print this device's visitor id.
    Whoami,

    /// Inspect or reset the stored conversation.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show identity, stored history and server health.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Print the stored conversation.
    Show {
        /// Only show the most recent N messages.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Delete the stored conversation.
    Reset,
}
