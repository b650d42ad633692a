//! Configuration types for Lure.
//!
//! `LureConfig` represents the top-level `config.toml` that selects the
//! inference endpoint, reply mode, persona, extraction categories, and the
//! evaluation callback. All fields have defaults, so an empty file (or no
//! file) yields a working configuration.

use serde::{Deserialize, Serialize};

use crate::intelligence::CategorySet;
use crate::wire::MessageMetadata;

/// Top-level configuration.
///
/// Loaded from `~/.lure/config.toml` (or `$LURE_DATA_DIR/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LureConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    /// How replies are fetched from the inference service.
    #[serde(default)]
    pub reply_mode: ReplyMode,

    #[serde(default)]
    pub persona: PersonaSetting,

    #[serde(default)]
    pub categories: CategorySetting,

    /// How the transcript is presented to the extraction model.
    #[serde(default)]
    pub transcript_format: TranscriptFormat,

    #[serde(default)]
    pub evaluation: EvaluationSettings,

    /// Metadata attached to sessions opened locally (CLI).
    #[serde(default)]
    pub metadata: MessageMetadata,
}

/// Inference-service endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional cap on reply length in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_max_tokens: Option<u32>,
}

fn default_base_url() -> String {
    "https://ai.gateway.lovable.dev/v1".to_string()
}

fn default_model() -> String {
    "google/gemini-3-flash-preview".to_string()
}

fn default_api_key_env() -> String {
    "LOVABLE_API_KEY".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    120
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_provider_timeout_secs(),
            reply_max_tokens: None,
        }
    }
}

/// Reply integration mode. One per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    /// Token-chunked SSE response routed through the stream decoder.
    #[default]
    Streaming,
    /// One JSON document holding the whole reply.
    SingleShot,
}

/// Built-in persona directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaPreset {
    /// Chatty, tech-confused retired schoolteacher.
    #[default]
    Margaret,
    /// Plain, cautious adult who asks short clarifying questions.
    Cautious,
}

/// Persona selection: a preset name or a literal directive.
///
/// ```toml
/// persona = "margaret"
/// # or
/// persona = { custom = "You are ..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonaSetting {
    Preset(PersonaPreset),
    Custom { custom: String },
}

impl Default for PersonaSetting {
    fn default() -> Self {
        PersonaSetting::Preset(PersonaPreset::default())
    }
}

/// Built-in extraction category sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPreset {
    /// The categories the evaluation callback expects.
    #[default]
    Submission,
    /// Contact details, wallets, and named entities.
    Extended,
}

/// Category selection: a preset name or an explicit key list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategorySetting {
    Preset(CategoryPreset),
    Custom(Vec<String>),
}

impl Default for CategorySetting {
    fn default() -> Self {
        CategorySetting::Preset(CategoryPreset::default())
    }
}

impl CategorySetting {
    /// Resolve to a concrete set. An empty custom list falls back to the
    /// submission preset.
    pub fn resolve(&self) -> CategorySet {
        match self {
            CategorySetting::Preset(CategoryPreset::Submission) => CategorySet::submission(),
            CategorySetting::Preset(CategoryPreset::Extended) => CategorySet::extended(),
            CategorySetting::Custom(keys) => {
                let set = CategorySet::new(keys.iter().cloned());
                if set.is_empty() {
                    CategorySet::submission()
                } else {
                    set
                }
            }
        }
    }
}

/// How the extractor presents the transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptFormat {
    /// One user turn holding `sender: text` blocks.
    #[default]
    Flattened,
    /// The turns themselves, role-tagged.
    Structured,
}

/// Evaluation callback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSettings {
    #[serde(default = "default_callback_url")]
    pub callback_url: String,

    #[serde(default = "default_callback_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_callback_url() -> String {
    "https://hackathon.guvi.in/api/updateHoneyPotFinalResult".to_string()
}

fn default_callback_timeout_secs() -> u64 {
    30
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            callback_url: default_callback_url(),
            timeout_secs: default_callback_timeout_secs(),
        }
    }
}
