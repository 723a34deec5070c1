//! Salesline terminal chat client.
//!
//! Binary name: `salesline`
//!
//! Parses CLI arguments, sets up tracing, resolves device state, then
//! dispatches to the matching command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use salesline_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, HistoryAction};
use state::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "salesline", &mut std::io::stdout());
        return Ok(());
    }

    let options = TracingOptions::from_verbosity(cli.verbose, cli.quiet)
        .with_json(cli.log_json)
        .with_otel(cli.otel);
    init_tracing(&options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(cli.server.as_deref()).await?;

    match cli.command {
        Commands::Chat => {
            cli::chat::loop_runner::run_chat_loop(&state, cli.quiet).await?;
        }

        Commands::Send { text, timeout_secs } => {
            let text = text.join(" ");
            cli::send::send_once(&state, &text, timeout_secs, cli.json).await?;
        }

        Commands::Whoami => {
            cli::whoami::whoami(&state, cli.json).await?;
        }

        Commands::History { action } => match action {
            HistoryAction::Show { limit } => {
                cli::history::show_history(&state, limit, cli.json).await?;
            }
            HistoryAction::Reset => {
                cli::history::reset_history(&state, cli.json).await?;
            }
        },

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
