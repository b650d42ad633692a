//! Slash commands for the chat loop.

use console::style;

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    /// Show the latest intelligence report.
    Report,
    /// Submit the final result to the evaluator.
    Submit,
    /// Start over with a new session.
    Reset,
    /// Show the conversation so far.
    History,
    Clear,
    Quit,
    Unknown(String),
}

/// Parse input as a slash command; `None` if it is a message.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    Some(match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/report" | "/intel" => ChatCommand::Report,
        "/submit" => ChatCommand::Submit,
        "/reset" | "/new" => ChatCommand::Reset,
        "/history" => ChatCommand::History,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/quit" | "/exit" | "/q" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(cmd),
    })
}

pub fn print_help() {
    let rows = [
        ("/help", "Show this help message"),
        ("/report", "Show the latest intelligence report"),
        ("/submit", "Submit the final result to the evaluator"),
        ("/reset", "Discard the conversation and start a new session"),
        ("/history", "Show the conversation so far"),
        ("/clear", "Clear the screen"),
        ("/quit", "End the chat"),
    ];

    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    for (cmd, help) in rows {
        println!("  {:<10} {}", style(cmd).cyan(), help);
    }
    println!();
    println!("  {}", style("Ctrl+D to exit").dim());
    println!();
}
