//! Web Search Tool
//!
//! Formats hits from a [`SearchClient`] as a numbered plain-text list.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use smartagent_core::{
    Arguments, Result as CoreResult, Tool, ToolOutput, ToolSchema,
    tool::{ParameterSchema, str_arg},
};

use crate::search::{SearchClient, SearchHit};

const DEFAULT_K: usize = 3;
const MAX_K: usize = 10;

pub struct WebSearchTool {
    client: Arc<dyn SearchClient>,
}

impl WebSearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }
}

/// Coerce `k` to a result count in `1..=10`; anything unreadable becomes 3
fn result_count(value: Option<&Value>) -> usize {
    let requested = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    requested.map_or(DEFAULT_K, |k| {
        usize::try_from(k.clamp(1, MAX_K as i64)).unwrap_or(DEFAULT_K)
    })
}

fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "no results".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}\n   {}\n   {}", i + 1, hit.title, hit.url, hit.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "web_search".into(),
            description: "Search the web and return top results with title, url and snippet."
                .into(),
            parameters: vec![
                ParameterSchema::required("query", "string", "What to search for"),
                ParameterSchema::optional("k", "integer", "Number of results (1-10, default 3)"),
            ],
        }
    }

    async fn execute(&self, args: &Arguments) -> CoreResult<ToolOutput> {
        let query = str_arg(args, "query")?;
        let k = result_count(args.get("k"));

        let hits = self.client.search(query, k).await?;
        tracing::info!(query, k, hits = hits.len(), backend = self.client.name(), "web search");

        Ok(format_hits(&hits).into())
    }
}
