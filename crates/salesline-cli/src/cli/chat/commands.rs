//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Reprint the conversation so far.
    History,
    /// Show connection and identity details.
    Status,
    /// Forget the stored conversation and start over.
    Clear,
    /// Exit the chat session.
    Exit,
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/history" => Some(ChatCommand::History),
        "/status" => Some(ChatCommand::Status),
        "/clear" | "/reset" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}     Show this help message", style("/help").cyan());
    println!("  {}  Show the conversation so far", style("/history").cyan());
    println!("  {}   Show connection details", style("/status").cyan());
    println!("  {}    Start a fresh conversation", style("/clear").cyan());
    println!("  {}     End the chat session", style("/exit").cyan());
    println!();
    println!(
        "  {}",
        style("Ctrl+D to exit. Your conversation is kept for next time.").dim()
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_help() {
        assert_eq!(parse("/help"), Some(ChatCommand::Help));
        assert_eq!(parse("/h"), Some(ChatCommand::Help));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn test_parse_exit() {
        assert_eq!(parse("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/QUIT"), Some(ChatCommand::Exit));
        assert_eq!(parse("  /q  "), Some(ChatCommand::Exit));
    }

    #[test]
    fn test_parse_clear_aliases() {
        assert_eq!(parse("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse("/reset"), Some(ChatCommand::Clear));
    }

    #[test]
    fn test_parse_ignores_arguments() {
        assert_eq!(parse("/history please"), Some(ChatCommand::History));
        assert_eq!(parse("/status now"), Some(ChatCommand::Status));
    }

    #[test]
    fn test_parse_not_command() {
        assert_eq!(parse("I need an app"), None);
        assert_eq!(parse("price / features?"), None);
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            parse("/remember x"),
            Some(ChatCommand::Unknown("/remember".to_string()))
        );
    }
}
