//! Search trait — the information-source collaborator.
//!
//! The pipeline uses it for optional context and the scheduler uses it to
//! discover improvement candidates. Both treat it as best-effort.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

/// A web search backend.
///
/// Implementations never fail: an unreachable backend yields no hits and an
/// unreadable page yields an empty string.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Search for `query`, returning at most `limit` hits.
    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit>;

    /// Fetch the readable text of a page; empty on failure.
    async fn fetch_content(&self, url: &str) -> String;
}
