//! Main chat loop.
//!
//! Reads the operator's lines, feeds them to the agent as the scammer's
//! turns, and leaves all drawing to the [`EventRenderer`] task.

use console::style;

use lure_core::agent::HoneypotAgent;
use lure_core::reply::TurnOutcome;
use lure_types::chat::MessageRole;
use lure_types::config::ReplyMode;

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::{EventRenderer, persona_label, print_report};

pub async fn run_chat_loop(state: &AppState, json: bool) -> anyhow::Result<()> {
    let agent = state.new_agent();
    let label = persona_label(&state.config.persona);
    let mode = match state.config.reply_mode {
        ReplyMode::Streaming => "streaming",
        ReplyMode::SingleShot => "single-shot",
    };
    print_welcome_banner(
        label,
        &state.config.provider.model,
        mode,
        agent.session_id().await.as_str(),
    );

    let prompt = format!("  {} ", style("Scammer >").red().bold());
    let (mut input, writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    let renderer = tokio::spawn(EventRenderer::new(label).run(agent.subscribe(), writer));

    loop {
        let text = match input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("  {}", style("Press Ctrl+D or /quit to exit.").dim());
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Report => show_report(&agent, json).await,
                ChatCommand::Submit => submit(&agent).await,
                ChatCommand::Reset => {
                    agent.reset().await;
                }
                ChatCommand::History => show_history(&agent, label).await,
                ChatCommand::Clear => input.clear(),
                ChatCommand::Quit => break,
                ChatCommand::Unknown(name) => println!(
                    "  {} Unknown command: {}. Type /help for available commands.",
                    style("?").yellow().bold(),
                    style(name).dim()
                ),
            }
            continue;
        }

        match agent.submit_utterance(&text).await {
            TurnOutcome::Failed { error } => {
                tracing::debug!(error = %error, "reply failed");
                println!("  {} {error}", style("!").red().bold());
            }
            TurnOutcome::Busy => {
                println!("  {}", style("Still replying; wait a moment.").dim());
            }
            TurnOutcome::Replied { .. } | TurnOutcome::Empty | TurnOutcome::Abandoned => {}
        }
    }

    println!("\n  {}", style("Session ended.").dim());
    agent.wait_for_analysis().await;
    if agent.intelligence().await.is_some() && agent.snapshot().await.last_submission.is_none() {
        println!(
            "  {}",
            style("The final result was not submitted (/submit).").dim()
        );
    }

    input.flush();
    renderer.abort();
    Ok(())
}

async fn show_report(agent: &HoneypotAgent, json: bool) {
    agent.wait_for_analysis().await;
    match agent.intelligence().await {
        Some(report) if json => match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => println!("  {} {e}", style("!").red().bold()),
        },
        Some(report) => print_report(&report),
        None => println!(
            "  {}",
            style("No intelligence yet; it is extracted after each reply.").dim()
        ),
    }
}

async fn submit(agent: &HoneypotAgent) {
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_message("waiting for analysis...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    agent.wait_for_analysis().await;
    spinner.set_message("submitting...");
    let outcome = agent.submit_final_result().await;
    spinner.finish_and_clear();

    // Success and failure are drawn from the submission event.
    if outcome.is_none() {
        println!(
            "  {} Nothing to submit yet; no intelligence has been extracted.",
            style("!").yellow().bold()
        );
    }
}

async fn show_history(agent: &HoneypotAgent, label: &str) {
    let snapshot = agent.snapshot().await;
    println!();
    for message in &snapshot.messages {
        let who = match message.role {
            MessageRole::User => style("Scammer").red().to_string(),
            MessageRole::Assistant => style(label).cyan().to_string(),
            MessageRole::System => continue,
        };
        println!("  {} {}", style(who).bold(), message.content);
    }
    println!();
}
