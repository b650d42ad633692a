//! `lure analyze <file>` -- one-off extraction over a saved history.

use std::path::Path;

use console::style;
use serde::Deserialize;

use lure_core::intelligence::IntelligenceExtractor;
use lure_types::chat::ChatMessage;
use lure_types::wire::ConversationMessage;

use crate::cli::chat::renderer::print_report;
use crate::state::AppState;

/// Accepted history file shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryFile {
    Turns(Vec<ConversationMessage>),
    Envelope {
        #[serde(rename = "conversationHistory")]
        conversation_history: Vec<ConversationMessage>,
    },
}

pub fn parse_history(content: &str) -> anyhow::Result<Vec<ChatMessage>> {
    let file: HistoryFile = serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("not a conversation history: {e}"))?;
    let turns = match file {
        HistoryFile::Turns(turns) => turns,
        HistoryFile::Envelope {
            conversation_history,
        } => conversation_history,
    };
    Ok(turns.iter().map(ConversationMessage::to_chat_message).collect())
}

pub async fn analyze_file(state: &AppState, path: &Path, json: bool) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let transcript = parse_history(&content)?;

    let extractor =
        IntelligenceExtractor::new(state.provider.clone(), state.settings.extractor.clone());

    let spinner = (!json).then(|| {
        let spinner = indicatif::ProgressBar::new_spinner();
        spinner.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
        );
        spinner.set_message("analyzing...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    });

    let result = extractor.analyze(&transcript).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!(
            "  {} {} turns analyzed",
            style("*").cyan().bold(),
            transcript.len()
        );
        print_report(&report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lure_types::chat::MessageRole;

    #[test]
    fn bare_array_and_envelope_are_accepted() {
        let bare = r#"[{"sender": "scammer", "text": "Pay now", "timestamp": 0},
                       {"sender": "user", "text": "Pay whom?", "timestamp": 1}]"#;
        let turns = parse_history(bare).unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, MessageRole::User);
        assert_eq!(turns[1].role, MessageRole::Assistant);

        let envelope = r#"{"sessionId": "x", "conversationHistory": [
            {"sender": "scammer", "text": "Pay now", "timestamp": "2026-01-21T10:15:30Z"}]}"#;
        assert_eq!(parse_history(envelope).unwrap().len(), 1);
    }

    #[test]
    fn other_shapes_are_rejected() {
        assert!(parse_history(r#"{"messages": []}"#).is_err());
        assert!(parse_history("not json").is_err());
    }

    #[tokio::test]
    async fn analyzes_a_history_file() {
        use crate::test_support::{StubProvider, StubSink};
        use lure_core::finalize::BoxEvaluationSink;
        use lure_core::llm::BoxLlmProvider;
        use lure_types::config::LureConfig;

        let state = AppState::from_parts(
            LureConfig::default(),
            BoxLlmProvider::new(StubProvider::new("unused")),
            BoxEvaluationSink::new(StubSink::default()),
        );
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        tokio::fs::write(
            &path,
            r#"[{"sender": "scammer", "text": "Send to 50100234567891", "timestamp": 0},
                {"sender": "user", "text": "Is that my bank?", "timestamp": 1}]"#,
        )
        .await
        .unwrap();

        analyze_file(&state, &path, true).await.unwrap();
        assert!(analyze_file(&state, &tmp.path().join("missing.json"), true).await.is_err());
    }
}
