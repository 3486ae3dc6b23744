//! End-to-end integration tests for Autoforge.
//!
//! These wire the real router, pipeline, stores, workspace writer, and
//! scheduler together, with only the model backends and search scripted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autoforge_config::{AppConfig, RouterConfig};
use autoforge_core::error::ProviderError;
use autoforge_core::event::EventBus;
use autoforge_core::provider::{Provider, ProviderProfile, ProviderRequest, ProviderResponse};
use autoforge_core::record::{DeploymentStatus, Outcome, RequestOrigin, Stage};
use autoforge_core::search::{SearchHit, SearchProvider};
use autoforge_core::store::{CONSTRUCTION_RECORDS, EVOLUTION_CYCLES, RecordFilter, RecordStore};
use autoforge_evolution::EvolutionScheduler;
use autoforge_extract::Extractor;
use autoforge_pipeline::{ConstructionPipeline, Deployer};
use autoforge_providers::ModelRouter;
use autoforge_store::{DegradingStore, InMemoryStore, JsonlStore};
use autoforge_tools::{CommandRunner, NoopSearch, WorkspaceWriter};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted results in sequence.
struct ScriptedProvider {
    name: String,
    results: Mutex<VecDeque<Result<String, ProviderError>>>,
    call_count: Mutex<usize>,
}

impl ScriptedProvider {
    fn new(name: &str, results: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            results: Mutex::new(results.into()),
            call_count: Mutex::new(0),
        })
    }

    fn texts(name: &str, texts: &[&str]) -> Arc<Self> {
        Self::new(name, texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        let next = self.results.lock().unwrap().pop_front();
        match next {
            Some(result) => result.map(|content| ProviderResponse {
                content,
                model: "mock".into(),
                usage: None,
            }),
            None => panic!("ScriptedProvider '{}' exhausted", self.name),
        }
    }
}

struct OneHitSearch;

#[async_trait::async_trait]
impl SearchProvider for OneHitSearch {
    fn name(&self) -> &str {
        "one_hit"
    }

    async fn search(&self, query: &str, _limit: usize) -> Vec<SearchHit> {
        vec![SearchHit {
            title: format!("Notes on {query}"),
            url: "https://example.com/notes".into(),
            snippet: "Batching writes reduces syscalls".into(),
        }]
    }

    async fn fetch_content(&self, _url: &str) -> String {
        String::new()
    }
}

fn local_profile() -> ProviderProfile {
    ProviderProfile {
        id: "ollama".into(),
        has_credentials: false,
        priority: 100,
        is_local: true,
    }
}

fn remote_profile(id: &str, priority: u32) -> ProviderProfile {
    ProviderProfile {
        id: id.into(),
        has_credentials: true,
        priority,
        is_local: false,
    }
}

struct Harness {
    pipeline: Arc<ConstructionPipeline>,
    store: Arc<dyn RecordStore>,
    events: Arc<EventBus>,
    workspace: tempfile::TempDir,
    _records: tempfile::TempDir,
}

fn harness(backends: Vec<(Arc<dyn Provider>, ProviderProfile)>) -> Harness {
    let workspace = tempfile::tempdir().unwrap();
    let records = tempfile::tempdir().unwrap();
    let events = Arc::new(EventBus::default());

    let router = ModelRouter::new(RouterConfig::default(), backends)
        .unwrap()
        .with_events(events.clone());
    let store: Arc<dyn RecordStore> = Arc::new(DegradingStore::new(
        Arc::new(JsonlStore::new(records.path())),
        Arc::new(InMemoryStore::new()),
    ));
    let deployer = Deployer::new(
        WorkspaceWriter::new(workspace.path().join("generated")),
        CommandRunner::new(vec![], Duration::from_secs(30)),
    );
    let pipeline = ConstructionPipeline::new(Arc::new(router), deployer)
        .with_extractor(Arc::new(Extractor::new().with_events(events.clone())))
        .with_store(store.clone())
        .with_events(events.clone());

    Harness {
        pipeline: Arc::new(pipeline),
        store,
        events,
        workspace,
        _records: records,
    }
}

fn local_only(texts: &[&str]) -> (Harness, Arc<ScriptedProvider>) {
    let provider = ScriptedProvider::texts("ollama", texts);
    (harness(vec![(provider.clone(), local_profile())]), provider)
}

const ARCHITECTURE: &str = r#"Here is the plan:
```json
{
  "overview": "Input validation helper module",
  "components": ["validators"],
  "dependencies": [],
  "files_to_create": ["validation/helpers.py"],
}
```"#;

const CODE: &str = r#"{
  "files": {
    "validation/helpers.py": "def not_empty(s):\n    return bool(s and s.strip())\n",
    "validation/__init__.py": "from .helpers import not_empty\n"
  },
  "installation_commands": [],
  "setup_instructions": []
}"#;

// ── E2E: Construction pipeline ───────────────────────────────────────────

#[tokio::test]
async fn e2e_prose_architect_still_reaches_review() {
    let (h, _) = local_only(&[
        "I think a small validation module would work well here.",
        CODE,
        r#"{"approved": false, "score": 4, "issues": ["needs tests"]}"#,
    ]);

    let record = h.pipeline.auto_construct("Add input validation helper").await;

    let architecture = record.architecture.as_ref().unwrap();
    assert!(architecture.overview.contains("Add input validation helper"));
    assert!(record.stages.iter().any(|t| t.stage == Stage::Reviewed));
    assert_eq!(record.outcome, Outcome::Rejected);
}

#[tokio::test]
async fn e2e_approved_feature_is_written_and_persisted() {
    let (h, provider) = local_only(&[
        ARCHITECTURE,
        CODE,
        r#"{"approved": true, "score": 8, "strengths": ["small"], "issues": []}"#,
    ]);

    let record = h.pipeline.auto_construct("Add input validation helper").await;

    assert_eq!(provider.calls(), 3);
    assert_eq!(record.outcome, Outcome::Deployed);
    assert!(record.success);
    let deployment = record.deployment.as_ref().unwrap();
    assert_eq!(deployment.status, DeploymentStatus::Success);
    assert_eq!(deployment.files_written.len(), 2);

    let helpers = h.workspace.path().join("generated/validation/helpers.py");
    let written = std::fs::read_to_string(helpers).unwrap();
    assert!(written.contains("def not_empty"));

    let stored = h
        .store
        .query(CONSTRUCTION_RECORDS, &RecordFilter::all())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["id"], record.id.as_str());
    assert_eq!(stored[0]["success"], true);
}

#[tokio::test]
async fn e2e_rejected_feature_writes_nothing() {
    let (h, _) = local_only(&[
        ARCHITECTURE,
        CODE,
        r#"{"approved": false, "issues": ["security risk"]}"#,
    ]);

    let record = h.pipeline.auto_construct("Add input validation helper").await;

    assert_eq!(record.outcome, Outcome::Rejected);
    assert!(!record.success);
    assert_eq!(record.rejection_reasons, vec!["security risk".to_string()]);
    assert!(!h.workspace.path().join("generated").exists());
}

#[tokio::test]
async fn e2e_forbidden_backend_requires_action_after_one_hop() {
    let google = ScriptedProvider::new(
        "google",
        vec![Err(ProviderError::ApiError {
            status_code: 403,
            message: "Forbidden: Generative Language API has not been used in this project".into(),
        })],
    );
    let ollama = ScriptedProvider::new(
        "ollama",
        vec![Err(ProviderError::Network("connection refused".into()))],
    );
    let h = harness(vec![
        (google.clone(), remote_profile("google", 10)),
        (ollama.clone(), local_profile()),
    ]);
    let mut rx = h.events.subscribe();

    let record = h.pipeline.auto_construct("Add input validation helper").await;

    assert_eq!(record.outcome, Outcome::Aborted);
    assert!(record.action_required);
    assert_eq!(google.calls(), 1);
    assert_eq!(ollama.calls(), 1);

    let mut fallbacks = 0;
    while let Ok(event) = rx.try_recv() {
        if event.kind() == "provider_fallback" {
            fallbacks += 1;
        }
    }
    assert_eq!(fallbacks, 1);
}

#[tokio::test]
async fn e2e_remote_failure_recovers_on_local_backend() {
    let rate_limited = || {
        Err(ProviderError::RateLimited {
            retry_after_secs: 5,
        })
    };
    let groq = ScriptedProvider::new("groq", vec![rate_limited(), rate_limited(), rate_limited()]);
    let ollama = ScriptedProvider::texts(
        "ollama",
        &[ARCHITECTURE, CODE, r#"{"approved": "yes", "score": "7/10"}"#],
    );
    let h = harness(vec![
        (groq.clone(), remote_profile("groq", 30)),
        (ollama.clone(), local_profile()),
    ]);

    let record = h.pipeline.auto_construct("Add input validation helper").await;

    assert_eq!(groq.calls(), 3);
    assert_eq!(ollama.calls(), 3);
    assert_eq!(record.outcome, Outcome::Deployed);
    assert!(record.success);
    assert_eq!(record.review.as_ref().unwrap().score, 7);
}

#[tokio::test]
async fn e2e_every_call_yields_exactly_one_record() {
    let (h, _) = local_only(&[
        ARCHITECTURE,
        CODE,
        r#"{"approved": true, "score": 9}"#,
        "not json at all",
        "{}",
        "{",
    ]);

    h.pipeline.auto_construct("first").await;
    let second = h.pipeline.auto_construct("second").await;

    assert_eq!(h.pipeline.history().await.len(), 2);
    assert_eq!(second.outcome, Outcome::Rejected);
    assert!(second.code.as_ref().unwrap().is_empty());
    let stored = h
        .store
        .query(CONSTRUCTION_RECORDS, &RecordFilter::all())
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

// ── E2E: Evolution ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_forced_cycle_builds_ranked_opportunity() {
    let (h, _) = local_only(&[
        r#"[
            {"type": "optimization", "description": "Batch record writes", "priority": "high", "implementation": "buffer appends"},
            {"type": "feature", "description": "Emoji logs", "priority": "low", "implementation": "none"}
        ]"#,
        ARCHITECTURE,
        CODE,
        r#"{"approved": true, "score": 8}"#,
    ]);
    let mut evolution = AppConfig::default().evolution;
    evolution.topics = vec!["rust batching".into()];
    evolution.max_daily_cycles = 1;

    let scheduler = EvolutionScheduler::new(h.pipeline.clone(), Arc::new(OneHitSearch), evolution)
        .with_store(h.store.clone());

    let cycle = scheduler.force_cycle_now().await.unwrap();

    assert_eq!(cycle.records.len(), 1);
    assert!(cycle.errors.is_empty());
    let history = h.pipeline.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].request.origin, RequestOrigin::Scheduled);
    assert_eq!(
        history[0].request.text,
        "optimization: Batch record writes - buffer appends"
    );
    assert!(history[0].success);

    let cycles = h
        .store
        .query(EVOLUTION_CYCLES, &RecordFilter::all())
        .await
        .unwrap();
    assert_eq!(cycles.len(), 1);

    assert!(scheduler.force_cycle_now().await.is_err());
}

#[tokio::test]
async fn e2e_scheduler_without_search_still_ranks() {
    let (h, provider) = local_only(&["[]"]);
    let mut evolution = AppConfig::default().evolution;
    evolution.topics = vec!["anything".into()];

    let scheduler = Arc::new(EvolutionScheduler::new(
        h.pipeline.clone(),
        Arc::new(NoopSearch),
        evolution,
    ));

    let cycle = scheduler.tick().await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert!(cycle.records.is_empty());
    assert!(scheduler.tick().await.is_none());
}
