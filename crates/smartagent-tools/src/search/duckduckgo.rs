//! DuckDuckGo web search client
//!
//! Scrapes the keyless HTML results page. Each organic result carries a
//! `result__a` title link (wrapped in a `/l/?uddg=` redirect) followed by an
//! optional `result__snippet`; sponsored results link through `y.js` and are
//! skipped.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use super::{SearchClient, SearchHit};
use crate::error::{Result, ToolsError};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

pub struct DuckDuckGoClient {
    http: reqwest::Client,
    base_url: String,
    page: ResultPage,
}

impl DuckDuckGoClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at another host (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(concat!("Mozilla/5.0 (compatible; smartagent/", env!("CARGO_PKG_VERSION"), ")"))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page: ResultPage::new()?,
        })
    }
}

/// Patterns for pulling hits out of a results page
struct ResultPage {
    title_link: Regex,
    href: Regex,
    snippet: Regex,
    tag: Regex,
    space: Regex,
}

impl ResultPage {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ToolsError::Search(format!("bad pattern: {e}")))
        };

        Ok(Self {
            title_link: compile(r#"(?s)<a([^>]*\bclass="result__a"[^>]*)>(.*?)</a>"#)?,
            href: compile(r#"\bhref="([^"]*)""#)?,
            snippet: compile(
                r#"(?s)<(a|div|td)[^>]*\bclass="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#,
            )?,
            tag: compile(r"<[^>]*>")?,
            space: compile(r"\s+")?,
        })
    }

    fn hits(&self, html: &str, max_results: usize) -> Vec<SearchHit> {
        let links: Vec<_> = self.title_link.captures_iter(html).collect();
        let mut hits = Vec::new();

        for (i, link) in links.iter().enumerate() {
            if hits.len() >= max_results {
                break;
            }

            let Some(href) = self.href.captures(&link[1]).map(|c| decode_entities(&c[1])) else {
                continue;
            };
            let Some(url) = target_url(&href) else {
                continue;
            };

            // The snippet sits between this title and the next one
            let start = link.get(0).map_or(0, |m| m.end());
            let end = links
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |m| m.start());
            let snippet = self
                .snippet
                .captures(&html[start..end])
                .map(|c| self.text(&c[2]))
                .unwrap_or_default();

            hits.push(SearchHit {
                title: self.text(&link[2]),
                url,
                snippet,
            });
        }

        hits
    }

    /// Visible text of an HTML fragment
    fn text(&self, fragment: &str) -> String {
        let stripped = self.tag.replace_all(fragment, "");
        let decoded = decode_entities(&stripped);
        self.space.replace_all(decoded.trim(), " ").into_owned()
    }
}

/// Resolve a result link to the page it points at; `None` for ads
fn target_url(href: &str) -> Option<String> {
    if href.contains("duckduckgo.com/y.js") {
        return None;
    }

    if let Some((_, query)) = href.split_once("uddg=") {
        let encoded = query.split('&').next().unwrap_or_default();
        return urlencoding::decode(encoded).ok().map(|url| url.into_owned());
    }

    match href {
        "" => None,
        h if h.starts_with("//") => Some(format!("https:{h}")),
        h => Some(h.to_string()),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[async_trait]
impl SearchClient for DuckDuckGoClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .http
            .get(format!("{}/html/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ToolsError::Search(format!(
                "DuckDuckGo returned {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        let hits = self.page.hits(&html, max_results);

        tracing::debug!(query, hits = hits.len(), "DuckDuckGo search finished");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "DuckDuckGo"
    }
}
