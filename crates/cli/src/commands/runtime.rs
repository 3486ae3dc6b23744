//! Wiring shared by the commands that drive the pipeline.

use autoforge_config::AppConfig;
use autoforge_core::event::EventBus;
use autoforge_core::search::SearchProvider;
use autoforge_core::store::RecordStore;
use autoforge_evolution::EvolutionScheduler;
use autoforge_extract::Extractor;
use autoforge_pipeline::{ConstructionPipeline, Deployer};
use autoforge_providers::build_from_config;
use autoforge_store::{DegradingStore, InMemoryStore, JsonlStore};
use autoforge_tools::{CommandRunner, GitVersionControl, HttpSearch, NoopSearch, WorkspaceWriter};
use std::sync::Arc;
use std::time::Duration;

pub struct Runtime {
    pub config: AppConfig,
    pub events: Arc<EventBus>,
    pub pipeline: Arc<ConstructionPipeline>,
    pub scheduler: Arc<EvolutionScheduler>,
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// JSONL files under `store.dir`, degrading to memory when the disk fails.
pub fn open_store(config: &AppConfig) -> Arc<dyn RecordStore> {
    Arc::new(DegradingStore::new(
        Arc::new(JsonlStore::new(&config.store.dir)),
        Arc::new(InMemoryStore::with_capacity(config.store.history_capacity)),
    ))
}

pub fn open_search(config: &AppConfig) -> Arc<dyn SearchProvider> {
    match &config.search.endpoint {
        Some(endpoint) => Arc::new(HttpSearch::new(
            endpoint,
            Duration::from_secs(config.search.timeout_secs),
        )),
        None => Arc::new(NoopSearch),
    }
}

impl Runtime {
    pub async fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let events = Arc::new(EventBus::default());
        let router = Arc::new(build_from_config(&config)?.with_events(events.clone()));
        let extractor = Arc::new(Extractor::new().with_events(events.clone()));
        let store = open_store(&config);
        let search = open_search(&config);

        let root = &config.pipeline.workspace_root;
        let mut deployer = Deployer::new(
            WorkspaceWriter::new(root),
            CommandRunner::new(
                config.pipeline.allowed_commands.clone(),
                config.pipeline.command_timeout(),
            ),
        );
        if config.pipeline.commit {
            let vcs = GitVersionControl::new(root).with_timeout(config.pipeline.command_timeout());
            deployer = deployer.with_version_control(Arc::new(vcs));
        }

        let mut pipeline = ConstructionPipeline::new(router, deployer)
            .with_extractor(extractor)
            .with_store(store.clone())
            .with_persist_timeout(config.store.write_timeout())
            .with_history_capacity(config.store.history_capacity)
            .with_events(events.clone());
        if config.pipeline.search_context {
            pipeline = pipeline.with_search(search.clone());
        }
        let pipeline = Arc::new(pipeline);

        let scheduler = EvolutionScheduler::new(pipeline.clone(), search, config.evolution.clone())
            .with_store(store)
            .with_persist_timeout(config.store.write_timeout())
            .with_history_capacity(config.store.history_capacity)
            .with_events(events.clone());
        let scheduler = Arc::new(scheduler);
        if let Err(e) = scheduler.load_history().await {
            tracing::warn!(error = %e, "Could not load evolution history");
        }

        Ok(Self {
            config,
            events,
            pipeline,
            scheduler,
        })
    }
}
