//! Shared fixtures for scheduler and cycle tests.

use async_trait::async_trait;
use autoforge_config::{EvolutionConfig, RouterConfig};
use autoforge_core::error::ProviderError;
use autoforge_core::provider::{Provider, ProviderProfile, ProviderRequest, ProviderResponse};
use autoforge_core::search::{SearchHit, SearchProvider};
use autoforge_pipeline::{ConstructionPipeline, Deployer};
use autoforge_providers::ModelRouter;
use autoforge_tools::{CommandRunner, WorkspaceWriter};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cycle::CycleRunner;

/// Answers with scripted results in order; an exhausted script answers
/// with an empty list of opportunities.
pub struct ScriptedProvider {
    results: Mutex<VecDeque<Result<String, ProviderError>>>,
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let next = self.results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok("[]".into()))
            .map(|content| ProviderResponse {
                content,
                model: "mock-model".into(),
                usage: None,
            })
    }
}

pub struct StaticSearch {
    hits: Vec<SearchHit>,
    pages: HashMap<String, String>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            pages: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        })
    }

    /// Serve `content` when `url` is fetched.
    pub fn with_page(self: Arc<Self>, url: &str, content: &str) -> Arc<Self> {
        let mut this = Arc::try_unwrap(self).ok().unwrap();
        this.pages.insert(url.into(), content.into());
        Arc::new(this)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.queries.lock().unwrap().push(query.to_string());
        self.hits.iter().take(limit).cloned().collect()
    }

    async fn fetch_content(&self, url: &str) -> String {
        self.pages.get(url).cloned().unwrap_or_default()
    }
}

pub fn hit(title: &str) -> SearchHit {
    SearchHit {
        title: title.into(),
        url: format!("https://example.com/{}", title.replace(' ', "-")),
        snippet: format!("About {title}"),
    }
}

pub fn config(topics: usize, candidates: usize, content_chars: usize) -> EvolutionConfig {
    let mut config = autoforge_config::AppConfig::default().evolution;
    config.topics = ["rust performance", "llm tooling", "code review"]
        .iter()
        .take(topics)
        .map(|t| t.to_string())
        .collect();
    config.max_candidates_per_cycle = candidates;
    config.results_per_topic = 2;
    config.content_chars = content_chars;
    config
}

/// A cycle runner over a pipeline whose only backend is scripted.
pub struct Env {
    pub runner: CycleRunner,
    _workspace: tempfile::TempDir,
}

impl Env {
    pub fn new(texts: &[&str], search: Arc<StaticSearch>, config: EvolutionConfig) -> Self {
        Self::with_results(texts.iter().map(|t| Ok(t.to_string())).collect(), search, config)
    }

    pub fn with_results(
        results: Vec<Result<String, ProviderError>>,
        search: Arc<StaticSearch>,
        config: EvolutionConfig,
    ) -> Self {
        let workspace = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider {
            results: Mutex::new(results.into()),
        });
        let profile = ProviderProfile {
            id: "ollama".into(),
            has_credentials: false,
            priority: 100,
            is_local: true,
        };
        let router =
            Arc::new(ModelRouter::new(RouterConfig::default(), vec![(provider, profile)]).unwrap());
        let deployer = Deployer::new(
            WorkspaceWriter::new(workspace.path()),
            CommandRunner::new(vec![], Duration::from_secs(10)),
        );
        let pipeline = Arc::new(ConstructionPipeline::new(router, deployer));
        Self {
            runner: CycleRunner::new(pipeline, search, config),
            _workspace: workspace,
        }
    }
}

pub const OPPORTUNITIES: &str = r#"```json
[
    {"type": "update", "description": "Refresh dependencies", "priority": "medium", "implementation": "cargo update"},
    {"type": "feature", "description": "Dark mode", "priority": "low", "implementation": "css"},
    {"type": "optimization", "description": "Batch record writes", "priority": "high", "implementation": "buffer appends"}
]
```"#;

pub const ARCHITECTURE: &str =
    r#"{"overview": "Batching layer", "components": ["buffer"], "dependencies": []}"#;

pub const CODE: &str = r#"{"files": {"batch/buffer.rs": "pub struct Buffer;"}, "installation_commands": []}"#;

pub const APPROVED: &str = r#"{"approved": true, "score": 9}"#;

pub const REJECTED: &str = r#"{"approved": false, "score": 2, "issues": ["too broad"]}"#;
