//! # smartagent-runtime
//!
//! Model backends for SmartAgent.
//!
//! ## Providers
//!
//! - **Gemini** (default): Google `generateContent` REST API with function calling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smartagent_runtime::gemini::{GeminiConfig, GeminiProvider};
//!
//! let config = GeminiConfig::from_env()?;
//! let agent = AgentBuilder::new()
//!     .model(config.model.clone())
//!     .provider(Arc::new(GeminiProvider::new(config)?))
//!     .build()?;
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

// Re-export core types for convenience
pub use smartagent_core::{AgentError, GenerationOptions, LlmProvider, ProviderResponse, Result};
