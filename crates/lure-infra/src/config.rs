//! Configuration loader for Lure.
//!
//! Reads `config.toml` from the data directory (`~/.lure/` by default) into
//! [`LureConfig`]. A missing or malformed file falls back to defaults.

use std::path::Path;

use secrecy::SecretString;

use lure_types::config::{LureConfig, ProviderSettings};
use lure_types::error::ConfigError;

use crate::filesystem::config_path;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: defaults.
/// - Unreadable or unparsable file: a warning, then defaults.
pub async fn load_config(data_dir: &Path) -> LureConfig {
    let path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", path.display());
            return LureConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return LureConfig::default();
        }
    };

    match parse_config(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            LureConfig::default()
        }
    }
}

/// Parse a configuration document.
pub fn parse_config(content: &str) -> Result<LureConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Read the inference API key from the environment variable named in
/// `settings.api_key_env`.
pub fn resolve_api_key(settings: &ProviderSettings) -> Result<SecretString, ConfigError> {
    match std::env::var(&settings.api_key_env) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim().to_string())),
        _ => Err(ConfigError::MissingEnv(settings.api_key_env.clone())),
    }
}
