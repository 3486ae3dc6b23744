//! The construction pipeline — drives one request through every stage and
//! records the outcome.

use autoforge_core::error::Error;
use autoforge_core::event::{DomainEvent, EventBus};
use autoforge_core::record::{
    Architecture, CodeBundle, ConstructionRecord, DeploymentResult, DeploymentStatus,
    FeatureRequest, Outcome, ReviewVerdict, Stage, StageTransition,
};
use autoforge_core::search::SearchProvider;
use autoforge_core::store::{CONSTRUCTION_RECORDS, RecordStore};
use autoforge_extract::Extractor;
use autoforge_providers::ModelRouter;
use autoforge_store::{DEFAULT_WRITE_TIMEOUT, InMemoryStore, append_within};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::deployer::Deployer;
use crate::history::History;
use crate::stage::StageContext;
use crate::{architect, coder, reviewer};

/// Everything gathered while a run is in flight.
struct RunState {
    id: String,
    request: FeatureRequest,
    architecture: Option<Architecture>,
    code: Option<CodeBundle>,
    review: Option<ReviewVerdict>,
    deployment: Option<DeploymentResult>,
    stages: Vec<StageTransition>,
}

impl RunState {
    fn new(request: FeatureRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request,
            architecture: None,
            code: None,
            review: None,
            deployment: None,
            stages: vec![StageTransition {
                stage: Stage::Requested,
                at: Utc::now(),
            }],
        }
    }

    fn reach(&mut self, stage: Stage) {
        self.stages.push(StageTransition {
            stage,
            at: Utc::now(),
        });
    }
}

/// How a run ended, before it is recorded.
struct Ending {
    outcome: Outcome,
    action_required: bool,
    error: Option<String>,
}

impl Ending {
    fn finished(outcome: Outcome) -> Self {
        Self {
            outcome,
            action_required: false,
            error: None,
        }
    }

    fn aborted(error: String, action_required: bool) -> Self {
        Self {
            outcome: Outcome::Aborted,
            action_required,
            error: Some(error),
        }
    }
}

/// Plan → implement → review → deploy, with an audit record for every run.
pub struct ConstructionPipeline {
    stage: StageContext,
    deployer: Deployer,
    store: Arc<dyn RecordStore>,
    persist_timeout: Duration,
    events: Arc<EventBus>,
    history: History<ConstructionRecord>,
}

impl ConstructionPipeline {
    pub fn new(router: Arc<ModelRouter>, deployer: Deployer) -> Self {
        Self {
            stage: StageContext::new(router, Arc::new(Extractor::new())),
            deployer,
            store: Arc::new(InMemoryStore::new()),
            persist_timeout: DEFAULT_WRITE_TIMEOUT,
            events: Arc::new(EventBus::default()),
            history: History::new(),
        }
    }

    /// Gather search context for the Architect and Coder.
    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.stage = self.stage.with_search(search);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<Extractor>) -> Self {
        self.stage.extractor = extractor;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = store;
        self
    }

    /// Bound on persisting each record; a slower store is skipped.
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Records kept in memory; older ones remain only in the store.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = History::with_capacity(capacity);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn router(&self) -> &Arc<ModelRouter> {
        &self.stage.router
    }

    pub fn extractor(&self) -> &Arc<Extractor> {
        &self.stage.extractor
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Build `feature_text` on behalf of a human caller.
    pub async fn auto_construct(&self, feature_text: &str) -> ConstructionRecord {
        self.construct(FeatureRequest::manual(feature_text)).await
    }

    /// Drive `request` to a recorded outcome. Never fails: errors and panics
    /// inside the run become an `Aborted` record.
    pub async fn construct(&self, request: FeatureRequest) -> ConstructionRecord {
        info!(request = %request.text, origin = ?request.origin, "Construction started");
        let mut run = RunState::new(request);

        let ending = match AssertUnwindSafe(self.drive(&mut run)).catch_unwind().await {
            Ok(Ok(outcome)) => Ending::finished(outcome),
            Ok(Err(e)) => Ending::aborted(e.to_string(), e.is_authorization()),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                error!(run_id = %run.id, panic = %message, "Construction run panicked");
                Ending::aborted(format!("panic: {message}"), false)
            }
        };

        let record = self.record(run, ending).await;
        (*record).clone()
    }

    /// Retained records, oldest first.
    pub async fn history(&self) -> Vec<Arc<ConstructionRecord>> {
        self.history.snapshot().await
    }

    /// Records produced by this process, including ones no longer retained.
    pub fn total_records(&self) -> usize {
        self.history.total()
    }

    async fn drive(&self, run: &mut RunState) -> Result<Outcome, Error> {
        self.entered(run, Stage::Planned);
        let architecture = architect::plan(&self.stage, &run.request)
            .await
            .inspect_err(|e| self.failed(run, Stage::Planned, e))?;
        run.architecture = Some(architecture.clone());
        self.completed(run, Stage::Planned);

        self.entered(run, Stage::Implemented);
        let code = coder::implement(&self.stage, &run.request, &architecture)
            .await
            .inspect_err(|e| self.failed(run, Stage::Implemented, e))?;
        run.code = Some(code.clone());
        self.completed(run, Stage::Implemented);

        self.entered(run, Stage::Reviewed);
        let verdict = reviewer::review(&self.stage, &run.request, &architecture, &code)
            .await
            .inspect_err(|e| self.failed(run, Stage::Reviewed, e))?;
        let approved = verdict.approved;
        run.review = Some(verdict);
        self.completed(run, Stage::Reviewed);

        if !approved {
            return Ok(Outcome::Rejected);
        }

        self.entered(run, Stage::Deployed);
        run.deployment = Some(self.deployer.deploy(&run.request, &code).await);
        Ok(Outcome::Deployed)
    }

    fn entered(&self, run: &RunState, stage: Stage) {
        self.events.publish(DomainEvent::StageEntered {
            run_id: run.id.clone(),
            stage,
            timestamp: Utc::now(),
        });
    }

    fn completed(&self, run: &mut RunState, stage: Stage) {
        run.reach(stage);
        self.events.publish(DomainEvent::StageCompleted {
            run_id: run.id.clone(),
            stage,
            timestamp: Utc::now(),
        });
    }

    fn failed(&self, run: &RunState, stage: Stage, error: &impl std::fmt::Display) {
        warn!(run_id = %run.id, %stage, error = %error, "Stage failed, aborting run");
        self.events.publish(DomainEvent::StageFailed {
            run_id: run.id.clone(),
            stage,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    async fn record(&self, mut run: RunState, ending: Ending) -> Arc<ConstructionRecord> {
        run.reach(ending.outcome.into());
        if ending.outcome == Outcome::Deployed {
            self.events.publish(DomainEvent::StageCompleted {
                run_id: run.id.clone(),
                stage: Stage::Deployed,
                timestamp: Utc::now(),
            });
        }
        run.reach(Stage::Recorded);

        let success = ending.outcome == Outcome::Deployed
            && run
                .deployment
                .as_ref()
                .is_some_and(|d| d.status == DeploymentStatus::Success);
        let rejection_reasons = match (&ending.outcome, &run.review) {
            (Outcome::Rejected, Some(review)) => review.issues.clone(),
            _ => Vec::new(),
        };

        let record = ConstructionRecord {
            id: run.id,
            request: run.request,
            architecture: run.architecture,
            code: run.code,
            review: run.review,
            deployment: run.deployment,
            outcome: ending.outcome,
            success,
            action_required: ending.action_required,
            rejection_reasons,
            error: ending.error,
            stages: run.stages,
            timestamp: Utc::now(),
        };

        let record = self.history.push(record).await;

        match serde_json::to_value(record.as_ref()) {
            Ok(value) => {
                if let Err(e) =
                    append_within(self.store.as_ref(), CONSTRUCTION_RECORDS, value, self.persist_timeout).await
                {
                    warn!(run_id = %record.id, error = %e, "Failed to persist construction record");
                }
            }
            Err(e) => warn!(run_id = %record.id, error = %e, "Failed to serialize construction record"),
        }

        self.events.publish(DomainEvent::RunRecorded {
            run_id: record.id.clone(),
            outcome: record.outcome,
            success: record.success,
            timestamp: record.timestamp,
        });

        info!(
            run_id = %record.id,
            outcome = ?record.outcome,
            success = record.success,
            action_required = record.action_required,
            "Construction recorded"
        );
        record
    }
}
