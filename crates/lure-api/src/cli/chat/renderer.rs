//! Terminal rendering of session events.
//!
//! The chat loop holds no reply state of its own: the persona's reply is
//! drawn from `MessageAppended`/`MessageDelta`/`MessageFinalized` events as
//! they arrive, in either reply mode.

use std::io::Write;

use console::style;
use tokio::sync::broadcast;

use lure_types::chat::{MessageRole, MessageState};
use lure_types::config::{PersonaPreset, PersonaSetting};
use lure_types::event::SessionEvent;
use lure_types::intelligence::IntelligenceReport;

/// Display name for the configured persona.
pub fn persona_label(persona: &PersonaSetting) -> &'static str {
    match persona {
        PersonaSetting::Preset(PersonaPreset::Margaret) => "Margaret",
        PersonaSetting::Preset(PersonaPreset::Cautious) => "Persona",
        PersonaSetting::Custom { .. } => "Persona",
    }
}

pub struct EventRenderer {
    label: String,
}

impl EventRenderer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Text to print for one event, if any.
    pub fn render(&self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::MessageAppended { message, .. } if message.role == MessageRole::Assistant => {
                let mut out = format!(
                    "\n  {} {}",
                    style(format!("{} >", self.label)).cyan().bold(),
                    message.content
                );
                if message.state == MessageState::Complete {
                    out.push_str("\n\n");
                }
                Some(out)
            }
            SessionEvent::MessageDelta { text, .. } => Some(text.clone()),
            SessionEvent::MessageFinalized { .. } => Some("\n\n".to_string()),
            SessionEvent::IntelligenceUpdated { sequence, report, .. } => Some(format!(
                "  {}\n",
                style(format!(
                    "[intel #{sequence}] scam: {} · threat: {} · confidence: {}% · {} evidence items",
                    if report.is_scam { "yes" } else { "no" },
                    report.threat_level,
                    report.confidence,
                    report.extracted_data.total(),
                ))
                .dim()
            )),
            SessionEvent::SessionReset { session_id, .. } => Some(format!(
                "\n  {} New session {}\n\n",
                style("*").cyan().bold(),
                style(session_id).dim()
            )),
            SessionEvent::FinalResultSubmitted { success, message, .. } => {
                let mark = if *success {
                    style("✓").green().bold()
                } else {
                    style("✗").red().bold()
                };
                Some(format!("\n  {mark} {message}\n\n"))
            }
            _ => None,
        }
    }

    /// Render events until the bus closes.
    pub async fn run<W: Write>(self, mut events: broadcast::Receiver<SessionEvent>, mut out: W) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(text) = self.render(&event) {
                        let _ = write!(out, "{text}");
                        let _ = out.flush();
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "renderer lagged behind session events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

/// Print a report in full.
pub fn print_report(report: &IntelligenceReport) {
    let verdict = if report.is_scam {
        style("SCAM").red().bold()
    } else {
        style("not a scam").green().bold()
    };

    println!();
    println!(
        "  {} {}  threat: {}  confidence: {}%",
        style("Verdict:").bold(),
        verdict,
        report.threat_level,
        report.confidence
    );
    if let Some(scam_type) = &report.scam_type {
        println!("  {} {}", style("Type:").bold(), scam_type);
    }
    if !report.summary.is_empty() {
        println!("  {} {}", style("Summary:").bold(), report.summary);
    }
    if !report.agent_notes.is_empty() {
        println!("  {} {}", style("Notes:").bold(), style(&report.agent_notes).dim());
    }

    println!();
    for (category, values) in report.extracted_data.iter() {
        if values.is_empty() {
            println!("  {:<20} {}", style(category).cyan(), style("-").dim());
        } else {
            println!("  {:<20} {}", style(category).cyan(), values.join(", "));
        }
    }

    if !report.indicators.is_empty() {
        println!();
        println!("  {}", style("Indicators:").bold());
        for indicator in &report.indicators {
            println!("    - {indicator}");
        }
    }
    println!();
}
