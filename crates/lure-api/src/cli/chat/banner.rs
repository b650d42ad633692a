//! Welcome banner.

use console::style;

pub fn print_welcome_banner(persona: &str, model: &str, mode: &str, session_id: &str) {
    println!();
    println!("  {} {}", style("*").cyan().bold(), style("Lure honeypot").cyan().bold());
    println!("  {}", style("You play the scammer; the persona answers.").dim());
    println!();
    println!("  {}  {}", style("Persona:").bold(), style(persona).dim());
    println!("  {}    {} ({})", style("Model:").bold(), style(model).dim(), mode);
    println!(
        "  {}  {}",
        style("Session:").bold(),
        style(&session_id[..8.min(session_id.len())]).dim()
    );
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}
