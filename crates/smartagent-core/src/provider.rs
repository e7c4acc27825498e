//! LLM Provider Strategy Pattern
//!
//! Defines the provider-neutral input the orchestration loop builds
//! ([`Content`]) and the interface every model backend implements.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smartagent_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = GeminiProvider::from_env()?;
//! let response = provider.generate(&contents, &tools.schemas(), &options).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::tool::{ToolCall, ToolResult, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gemini-1.5-flash")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// System instruction sent alongside the contents
    #[serde(default)]
    pub system_prompt: Option<String>,
}

const fn default_temperature() -> f32 {
    0.2
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".into(),
            temperature: default_temperature(),
            system_prompt: None,
        }
    }
}

/// Speaker of a provider-input entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
    /// Tool results fed back to the model
    Tool,
}

/// One piece of a provider-input entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    FunctionCall(ToolCall),
    FunctionResponse(ToolResult),
}

/// One entry of the provider input
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: ContentRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Model turn replaying the requested calls, in request order
    pub fn model_calls(calls: &[ToolCall]) -> Self {
        Self {
            role: ContentRole::Model,
            parts: calls.iter().cloned().map(Part::FunctionCall).collect(),
        }
    }

    /// Tool turn carrying one result per requested call
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: ContentRole::Tool,
            parts: results.into_iter().map(Part::FunctionResponse).collect(),
        }
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        })
    }

    pub fn function_responses(&self) -> impl Iterator<Item = &ToolResult> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionResponse(result) => Some(result),
            _ => None,
        })
    }
}

/// Raw provider response document.
///
/// Expected to carry `candidates[].content.parts[]`, each part holding either
/// `text` or a function call. The shape is not trusted: it is only read
/// through [`crate::normalize`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderResponse(pub Value);

impl From<Value> for ProviderResponse {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Display name used in user-facing upstream error replies
    fn name(&self) -> &str;

    /// Send the contents and advertised tools, returning the raw response
    async fn generate(
        &self,
        contents: &[Content],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<ProviderResponse>;
}
