//! Errors raised by LLM requests

/// Failures of glossary, lineage and semantic model requests
///
/// Responses that do not follow the requested shape are not errors; they
/// come back as raw text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AiError {
    /// No API key, or no client could be built
    #[error("LLM client not configured: {0}")]
    NotConfigured(String),

    /// User-supplied input could not be parsed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request failed: {0}")]
    RequestError(String),

    /// The API answered with a body that is not a completion
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, AiError>;
