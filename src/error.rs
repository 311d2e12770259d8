//! Error types for AR Assist.

/// Top-level error type for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Trigger-input errors. Malformed trigger data will not become valid on a
/// re-run, so these are terminal.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Work item is missing required input: {reason}")]
    MissingInput { reason: String },

    #[error("Malformed work item payload: {0}")]
    MalformedPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM call errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Network, timeout, or non-success HTTP from the completion endpoint.
    #[error("Provider {provider} request failed: {reason}")]
    RemoteCall { provider: String, reason: String },

    /// The model's output does not conform to the requested schema.
    #[error("Invalid response from {provider}: {reason}")]
    UpstreamFormat { provider: String, reason: String },
}

/// Email-API errors.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The email API returned a non-success status.
    #[error("Mail API rejected send: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Network or timeout before any status was received.
    #[error("Mail API request failed: {0}")]
    RemoteCall(String),
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
