//! Web search — the information source for context and discovery.
//!
//! `HttpSearch` talks to a SearxNG-compatible JSON API and fetches pages
//! as plain text. `NoopSearch` stands in when no endpoint is configured.
//! Both follow the trait contract: failures yield empty results, never errors.

use async_trait::async_trait;
use autoforge_core::search::{SearchHit, SearchProvider};
use regex_lite::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum characters kept from a fetched page.
const MAX_PAGE_CHARS: usize = 20_000;

pub struct HttpSearch {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSearch {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("autoforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn try_search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, reqwest::Error> {
        let url = format!("{}/search", self.endpoint);
        let response: SearxResponse = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.into_hits(limit))
    }

    async fn try_fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html_to_text(&body))
    }
}

#[async_trait]
impl SearchProvider for HttpSearch {
    fn name(&self) -> &str {
        "http"
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        match self.try_search(query, limit).await {
            Ok(hits) => {
                debug!(query, hits = hits.len(), "Search complete");
                hits
            }
            Err(e) => {
                warn!(query, error = %e, "Search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_content(&self, url: &str) -> String {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return String::new();
        }
        match self.try_fetch(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url, error = %e, "Content fetch failed");
                String::new()
            }
        }
    }
}

/// Search is disabled.
pub struct NoopSearch;

#[async_trait]
impl SearchProvider for NoopSearch {
    fn name(&self) -> &str {
        "noop"
    }

    async fn search(&self, _query: &str, _limit: usize) -> Vec<SearchHit> {
        Vec::new()
    }

    async fn fetch_content(&self, _url: &str) -> String {
        String::new()
    }
}

#[derive(Debug, Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

#[derive(Debug, Deserialize)]
struct SearxResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl SearxResponse {
    fn into_hits(self, limit: usize) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .take(limit)
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.content,
            })
            .collect()
    }
}

static SCRIPT_OR_STYLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").ok());
static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").ok());
static SPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Reduce an HTML page to its readable text.
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();
    for (pattern, replacement) in [(&SCRIPT_OR_STYLE, " "), (&TAG, " "), (&SPACE, " ")] {
        if let Some(re) = pattern.as_ref() {
            text = re.replace_all(&text, replacement).into_owned();
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    text.trim().chars().take(MAX_PAGE_CHARS).collect()
}
