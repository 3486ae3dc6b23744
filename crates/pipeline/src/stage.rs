//! What every model-backed stage needs.

use autoforge_core::search::{SearchHit, SearchProvider};
use autoforge_extract::Extractor;
use autoforge_providers::ModelRouter;
use std::sync::Arc;
use tracing::debug;

/// Collaborators shared by the Architect, Coder, and Reviewer.
#[derive(Clone)]
pub struct StageContext {
    pub router: Arc<ModelRouter>,
    pub extractor: Arc<Extractor>,
    /// `None` disables search context.
    pub search: Option<Arc<dyn SearchProvider>>,
}

impl StageContext {
    pub fn new(router: Arc<ModelRouter>, extractor: Arc<Extractor>) -> Self {
        Self {
            router,
            extractor,
            search: None,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    /// Best-effort search results rendered for a prompt. Empty when search
    /// is disabled or finds nothing.
    pub async fn search_context(&self, query: &str, limit: usize) -> String {
        let Some(search) = &self.search else {
            return String::new();
        };
        let hits = search.search(query, limit).await;
        debug!(query, hits = hits.len(), "Gathered search context");
        render_hits(&hits)
    }
}

fn render_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("- {} ({})\n  {}", h.title, h.url, h.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}
