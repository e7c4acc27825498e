//! Web Search Integration
//!
//! Backends the `web_search` tool can query.

mod duckduckgo;

pub use duckduckgo::DuckDuckGoClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One search hit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Search backend trait (Strategy pattern)
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run a query, returning at most `max_results` hits
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// Backend name
    fn name(&self) -> &str;
}
