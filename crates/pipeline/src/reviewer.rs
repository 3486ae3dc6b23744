//! Reviewer — judges a [`CodeBundle`] against its [`Architecture`].
//!
//! The verdict's `approved` flag is the only gate to deployment, so it is
//! never guessed: unparseable output or a missing/non-boolean `approved`
//! becomes `approved = false` with an issue explaining why.

use autoforge_core::error::ProviderError;
use autoforge_core::record::{Architecture, CodeBundle, FeatureRequest, ReviewVerdict};
use autoforge_extract::json_prompt;
use autoforge_extract::prompt::review_schema;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::stage::StageContext;

pub const UNPARSEABLE_REVIEW: &str = "Review response could not be parsed; treated as not approved";
pub const MISSING_APPROVAL: &str =
    "Review did not include a boolean 'approved' decision; treated as not approved";

fn instruction(architecture: &Architecture, code: &CodeBundle) -> String {
    let plan = serde_json::to_string_pretty(architecture).unwrap_or_default();
    let code = serde_json::to_string_pretty(code).unwrap_or_default();
    format!(
        "You are the Reviewer of an autonomous software construction system.\n\n\
         Architecture:\n{plan}\n\n\
         Implemented code:\n{code}\n\n\
         Review it thoroughly and answer with:\n\
         - approved (bool): whether the code is ready to deploy\n\
         - score (int): 0 to 10\n\
         - strengths, issues, suggestions (lists)\n\
         - security_check, performance_check, compatibility_check (strings)\n\
         If you cannot analyse it, answer approved=false and explain why in issues."
    )
}

/// Review `code`. Never approves by accident; only backend failures are errors.
pub async fn review(
    ctx: &StageContext,
    request: &FeatureRequest,
    architecture: &Architecture,
    code: &CodeBundle,
) -> Result<ReviewVerdict, ProviderError> {
    let schema = review_schema();
    let prompt = json_prompt(&instruction(architecture, code), Some(&schema));
    let routing_context = format!("{}\nReview {}", request.text, architecture.overview);
    let raw = ctx.router.route(&prompt, &routing_context).await?;

    let value: Option<Value> = ctx.extractor.safe_extract_for("reviewer", &raw, None);
    let verdict = normalize(value);

    info!(approved = verdict.approved, score = verdict.score, issues = verdict.issues.len(), "Review complete");
    Ok(verdict)
}

/// Build a verdict from whatever JSON the reviewer produced.
pub fn normalize(value: Option<Value>) -> ReviewVerdict {
    let Some(Value::Object(map)) = value else {
        return ReviewVerdict::rejected(UNPARSEABLE_REVIEW);
    };

    let mut verdict = ReviewVerdict {
        approved: false,
        score: score(map.get("score")),
        strengths: list(&map, "strengths"),
        issues: list(&map, "issues"),
        suggestions: list(&map, "suggestions"),
        security_check: text(&map, "security_check"),
        performance_check: text(&map, "performance_check"),
        compatibility_check: text(&map, "compatibility_check"),
    };

    match approval(map.get("approved")) {
        Some(approved) => verdict.approved = approved,
        None => {
            warn!("Review without an approval decision, treating as rejected");
            verdict.issues.push(MISSING_APPROVAL.into());
        }
    }

    verdict
}

fn approval(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn score(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().split('/').next().and_then(|s| s.trim().parse().ok()),
        _ => None,
    };
    raw.filter(|s: &f64| s.is_finite())
        .map(|s| s.round().clamp(0.0, 10.0) as u8)
        .unwrap_or(0)
}

fn list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn text(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
