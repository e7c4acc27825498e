//! # smartagent-core
//!
//! Tool-calling orchestration for a chat agent, independent of any model backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Agent                               │
//! │  ┌──────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Orchestration│  │    Tools    │  │   LlmProvider       │  │
//! │  │     Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └──────────────┘  └─────────────┘  └─────────────────────┘  │
//! │        │                                      │              │
//! │  ┌──────────────┐                    ┌─────────────────────┐ │
//! │  │ SessionStore │                    │ ResponseNormalizer  │ │
//! │  └──────────────┘                    └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait keeps the loop unaware of the wire format of
//! whichever backend answers; provider responses are normalized at the
//! boundary by [`normalize`].

pub mod content;
pub mod error;
pub mod message;
pub mod normalize;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Role, Turn};
pub use provider::{Content, ContentRole, GenerationOptions, LlmProvider, Part, ProviderResponse};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, StopReason, TurnOutcome};
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
pub use tool::{Arguments, Tool, ToolCall, ToolOutput, ToolRegistry, ToolResult, ToolSchema};
