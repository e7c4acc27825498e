//! # smartagent-tools
//!
//! Built-in tools the SmartAgent exposes to the model.
//!
//! ```text
//! ┌──────────────────┬───────────────────────────────────────────────┐
//! │ calc             │ arithmetic only: + - * / // % ** and parens    │
//! │ time_in_timezone │ local time for an IANA zone or a city alias    │
//! │ web_search       │ top hits from DuckDuckGo's HTML results page   │
//! └──────────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! Every failure inside a tool surfaces to the model as an `error: ...`
//! string rather than aborting the turn.

pub mod error;
pub mod expr;
pub mod search;
pub mod svckit;

use std::sync::Arc;

use smartagent_core::ToolRegistry;

pub use error::{Result, ToolsError};
pub use search::{DuckDuckGoClient, SearchClient, SearchHit};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{CalcTool, TimeInTimezoneTool, WebSearchTool};
}

/// Registry holding `calc`, `time_in_timezone` and `web_search`
pub fn builtin_registry(search: Arc<dyn SearchClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(tools::CalcTool);
    registry.register(tools::TimeInTimezoneTool);
    registry.register(tools::WebSearchTool::new(search));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_names() {
        let search = Arc::new(DuckDuckGoClient::new().unwrap());
        let registry = builtin_registry(search);
        assert_eq!(
            registry.names(),
            vec!["calc", "time_in_timezone", "web_search"]
        );
    }
}
