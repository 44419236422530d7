use thiserror::Error;

/// Failures talking to a language model backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("{provider} request failed: {message}")]
    Api { provider: String, message: String },

    #[error("request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("unknown LLM provider '{0}'")]
    UnknownProvider(String),

    #[error("{0}")]
    Other(String),
}
