//! Inference provider implementations.

pub mod openai_compat;

use std::time::Duration;

use secrecy::SecretString;

use lure_core::llm::BoxLlmProvider;
use lure_types::config::ProviderSettings;
use lure_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;

/// Build the configured provider behind a [`BoxLlmProvider`].
pub fn create_provider(
    settings: &ProviderSettings,
    api_key: SecretString,
) -> Result<BoxLlmProvider, LlmError> {
    if settings.base_url.trim().is_empty() {
        return Err(LlmError::InvalidRequest("provider base_url is empty".to_string()));
    }

    let provider = OpenAiCompatibleProvider::new(
        api_key,
        settings.base_url.trim(),
        settings.model.clone(),
        Duration::from_secs(settings.timeout_secs),
    )?;

    tracing::debug!(base_url = %settings.base_url, model = %settings.model, "created inference provider");
    Ok(BoxLlmProvider::new(provider))
}
