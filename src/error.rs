//! Error types for the channel planner.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chat gateway errors (Microsoft Graph or any other channel provider).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Authentication failed: {reason}")]
    Auth { reason: String },

    #[error("Request failed: {reason}")]
    Request { reason: String },

    #[error("Request returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request {
            reason: e.to_string(),
        }
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Planning pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// A collaborator the operation needs (gateway) was never configured.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The model returned text that does not parse as the action schema.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] GatewayError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}
