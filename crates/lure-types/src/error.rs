use thiserror::Error;

/// Errors from posting a final result to the evaluation sink.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("evaluation callback unreachable: {0}")]
    Transport(String),

    #[error("evaluation callback failed: {status} - {body}")]
    Status { status: u16, body: String },
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable '{0}' is not set")]
    MissingEnv(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
