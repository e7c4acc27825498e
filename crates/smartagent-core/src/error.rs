//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// None of these escape a chat turn: the orchestration loop turns provider
/// failures into an apologetic reply and tool failures into `error: ...`
/// results that are handed back to the model.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider rejected or failed the request
    #[error("{0}")]
    Provider(String),

    /// Provider unreachable (connect/transport failure)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider call exceeded its deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Tool not found in registry
    #[error("unknown tool {0}")]
    ToolNotFound(String),

    /// Tool arguments did not match the declared parameters
    #[error("{0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("{0}")]
    ToolExecution(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
