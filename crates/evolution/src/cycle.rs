//! One evolution cycle: observe, discover, rank, and build.

use autoforge_config::EvolutionConfig;
use autoforge_core::record::{EvolutionCycle, FeatureRequest, Outcome};
use autoforge_core::search::SearchProvider;
use autoforge_extract::{json_prompt, prompt::opportunities_schema};
use autoforge_pipeline::ConstructionPipeline;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::opportunity::{self, Opportunity};

/// A search result worth showing to the ranking model.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub topic: String,
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Runs the steps of a cycle against a pipeline. Admission and bookkeeping
/// are the scheduler's job.
pub struct CycleRunner {
    pipeline: Arc<ConstructionPipeline>,
    search: Arc<dyn SearchProvider>,
    config: EvolutionConfig,
}

impl CycleRunner {
    pub fn new(
        pipeline: Arc<ConstructionPipeline>,
        search: Arc<dyn SearchProvider>,
        config: EvolutionConfig,
    ) -> Self {
        Self {
            pipeline,
            search,
            config,
        }
    }

    pub fn pipeline(&self) -> &Arc<ConstructionPipeline> {
        &self.pipeline
    }

    /// Run every step, recording progress and failures on `cycle`.
    pub async fn run(&self, cycle: &mut EvolutionCycle) {
        cycle.snapshot = Some(self.snapshot().await);
        cycle.steps.push("snapshot".into());

        let findings = self.discover().await;
        cycle.steps.push("search".into());

        let opportunities = match self.rank(cycle.snapshot.as_ref(), &findings).await {
            Ok(opportunities) => opportunities,
            Err(e) => {
                cycle.errors.push(format!("rank: {e}"));
                Vec::new()
            }
        };
        cycle.steps.push("rank".into());

        for opportunity in opportunities {
            let candidate = opportunity.candidate();
            info!(cycle_id = %cycle.id, candidate = %candidate, "Submitting opportunity");

            let record = self
                .pipeline
                .construct(FeatureRequest::scheduled(candidate.clone()))
                .await;

            cycle.steps.push(format!("construct_{}", step_name(&opportunity.kind)));
            cycle.records.push(record.id.clone());
            if record.outcome == Outcome::Aborted {
                let reason = record.error.as_deref().unwrap_or("aborted");
                cycle.errors.push(format!("{candidate}: {reason}"));
            }
        }
    }

    /// Feature flags, backend availability, and history counts.
    async fn snapshot(&self) -> Value {
        let router = self.pipeline.router();
        let providers: Vec<Value> = router
            .profiles()
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "usable": p.is_usable(),
                    "local": p.is_local,
                })
            })
            .collect();

        let records = self.pipeline.history().await;
        let deployed = records.iter().filter(|r| r.outcome == Outcome::Deployed).count();
        let aborted = records.iter().filter(|r| r.outcome == Outcome::Aborted).count();

        json!({
            "features": {
                "topics": self.config.topics,
                "max_candidates_per_cycle": self.config.max_candidates_per_cycle,
            },
            "providers": providers,
            "terminal_provider": router.terminal(),
            "history": {
                "construction_records": self.pipeline.total_records(),
                "deployed": deployed,
                "aborted": aborted,
                "extraction_failures": self.pipeline.extractor().diagnostics().len(),
            },
        })
    }

    /// Search every topic and collect page content.
    pub async fn discover(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        for topic in &self.config.topics {
            let hits = self.search.search(topic, self.config.results_per_topic).await;
            debug!(topic = %topic, hits = hits.len(), "Searched topic");

            for hit in hits {
                let fetched = self.search.fetch_content(&hit.url).await;
                let content = if fetched.trim().is_empty() {
                    hit.snippet.clone()
                } else {
                    truncate_chars(&fetched, self.config.content_chars)
                };
                findings.push(Finding {
                    topic: topic.clone(),
                    title: hit.title,
                    url: hit.url,
                    content,
                });
            }
        }
        findings
    }

    /// Ask a backend which improvements to make, keeping the best few.
    async fn rank(
        &self,
        snapshot: Option<&Value>,
        findings: &[Finding],
    ) -> Result<Vec<Opportunity>, autoforge_core::ProviderError> {
        let instruction = format!(
            "You maintain an autonomous software construction system.\n\n\
             Current system state:\n{}\n\n\
             Improvements found on the web:\n{}\n\n\
             Identify evolution opportunities that make the system more \
             autonomous, faster, or more useful. Return an array of objects.",
            pretty(snapshot.unwrap_or(&Value::Null)),
            pretty(&json!(findings)),
        );
        let prompt = json_prompt(&instruction, Some(&opportunities_schema()));

        let raw = self
            .pipeline
            .router()
            .route(&prompt, "Identify evolution opportunities")
            .await?;

        let answer = self.pipeline.extractor().safe_extract_for("evolution", &raw, Value::Null);
        let ranked = opportunity::rank(
            opportunity::parse(&answer),
            self.config.max_candidates_per_cycle,
        );
        if ranked.is_empty() {
            warn!("No actionable opportunities in ranking answer");
        }
        Ok(ranked)
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

fn step_name(kind: &str) -> String {
    kind.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
