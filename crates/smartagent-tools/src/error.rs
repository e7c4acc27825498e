//! Error Types for the built-in tools

use smartagent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolsError>;

#[derive(Error, Debug, PartialEq)]
pub enum ToolsError {
    /// Expression uses something outside the allowed arithmetic subset
    #[error("Unsupported expression")]
    UnsupportedExpression,

    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("numerical result out of range")]
    OutOfRange,

    #[error("unknown timezone (use IANA tz like 'Asia/Kolkata')")]
    UnknownTimezone,

    #[error("search failed: {0}")]
    Search(String),
}

impl From<reqwest::Error> for ToolsError {
    fn from(err: reqwest::Error) -> Self {
        Self::Search(err.to_string())
    }
}

impl From<ToolsError> for AgentError {
    fn from(err: ToolsError) -> Self {
        Self::ToolExecution(err.to_string())
    }
}
