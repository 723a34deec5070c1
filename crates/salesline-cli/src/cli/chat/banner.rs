//! Welcome banner display for chat sessions.

use console::style;

use salesline_types::connection::ConnectionState;
use salesline_types::visitor::VisitorId;

use super::renderer::connection_label;

/// Print the full banner shown the first time chat opens on this device.
pub fn print_welcome_banner(server_url: &str, visitor_id: &VisitorId, state: ConnectionState) {
    println!();
    println!("  {} {}", style("⚡").bold(), style("Salesline").cyan().bold());
    println!(
        "  {}",
        style("Tell us about the project you want to build.").dim()
    );
    println!();
    println!("  {}   {}", style("Server:").bold(), style(server_url).dim());
    println!(
        "  {}  {}",
        style("Visitor:").bold(),
        style(short_id(visitor_id)).dim()
    );
    println!("  {}   {}", style("Status:").bold(), connection_label(state));
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}

/// One-line banner for returning visitors.
pub fn print_compact_banner(state: ConnectionState) {
    println!();
    println!(
        "  {} {} {}",
        style("Salesline").cyan().bold(),
        style("·").dim(),
        connection_label(state)
    );
    println!("  {}", style("Welcome back. /help for commands").dim());
    println!();
}

fn short_id(visitor_id: &VisitorId) -> String {
    let id = visitor_id.to_string();
    id[..8.min(id.len())].to_string()
}
