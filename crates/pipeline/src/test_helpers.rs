//! Shared test helpers for pipeline tests.

use async_trait::async_trait;
use autoforge_config::RouterConfig;
use autoforge_core::error::ProviderError;
use autoforge_core::provider::{Provider, ProviderProfile, ProviderRequest, ProviderResponse};
use autoforge_core::search::{SearchHit, SearchProvider};
use autoforge_extract::Extractor;
use autoforge_providers::ModelRouter;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::stage::StageContext;

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue.
/// Panics if more calls are made than results provided.
pub struct ScriptedProvider {
    name: String,
    results: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, results: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            results: Mutex::new(results.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// A provider answering with `texts` in order.
    pub fn texts(name: &str, texts: &[&str]) -> Arc<Self> {
        Self::new(name, texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt);
        let next = self.results.lock().unwrap().pop_front();
        match next {
            Some(result) => result.map(|content| ProviderResponse {
                content,
                model: "mock-model".into(),
                usage: None,
            }),
            None => panic!("ScriptedProvider '{}': no more responses", self.name),
        }
    }
}

/// A provider that panics on every call.
pub struct PanickingProvider;

#[async_trait]
impl Provider for PanickingProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        panic!("backend exploded");
    }
}

pub fn local_profile() -> ProviderProfile {
    ProviderProfile {
        id: "ollama".into(),
        has_credentials: false,
        priority: 100,
        is_local: true,
    }
}

/// A router whose only backend is `provider`, registered as the local one.
pub fn local_router(provider: Arc<dyn Provider>) -> Arc<ModelRouter> {
    Arc::new(ModelRouter::new(RouterConfig::default(), vec![(provider, local_profile())]).unwrap())
}

pub fn context(provider: Arc<dyn Provider>) -> StageContext {
    StageContext::new(local_router(provider), Arc::new(Extractor::new()))
}

/// A search backend with fixed hits that remembers its queries.
pub struct StaticSearch {
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            queries: Mutex::new(Vec::new()),
        })
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

    async fn fetch_content(&self, _url: &str) -> String {
        String::new()
    }
}

pub fn hit(title: &str) -> SearchHit {
    SearchHit {
        title: title.into(),
        url: format!("https://example.com/{}", title.replace(' ', "-")),
        snippet: format!("About {title}"),
    }
}

pub const ARCHITECTURE: &str = r#"{
    "overview": "Input validation helper module",
    "components": ["validator"],
    "dependencies": ["pydantic"],
    "files_to_create": ["validation/helpers.py"],
    "testing_strategy": "pytest"
}"#;

pub const CODE: &str = r#"```json
{
    "files": {
        "validation/helpers.py": "def is_email(s):\n    return '@' in s\n",
        "validation/__init__.py": ""
    },
    "installation_commands": [],
    "setup_instructions": ["import validation.helpers"]
}
```"#;

pub const APPROVED: &str = r#"{"approved": true, "score": 8, "strengths": ["small"], "issues": []}"#;

pub const REJECTED: &str = r#"{"approved": false, "score": 3, "issues": ["security risk"]}"#;
