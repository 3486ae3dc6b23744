//! Domain records — the shapes every pipeline stage produces and the audit
//! trail the system keeps.
//!
//! Stage outputs (`Architecture`, `CodeBundle`, `ReviewVerdict`) are built
//! from model text, so their deserializers are forgiving about field types:
//! a list where a string was expected, or a number where a list of strings
//! was expected, is coerced rather than rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Requests ────────────────────────────────────────────────────────────────

/// Who asked for a construction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOrigin {
    Manual,
    Scheduled,
}

/// A natural-language description of something to build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRequest {
    pub text: String,
    pub origin: RequestOrigin,
    pub created_at: DateTime<Utc>,
}

impl FeatureRequest {
    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: RequestOrigin::Manual,
            created_at: Utc::now(),
        }
    }

    pub fn scheduled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: RequestOrigin::Scheduled,
            created_at: Utc::now(),
        }
    }
}

// ── Stage outputs ───────────────────────────────────────────────────────────

/// The Architect's plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Architecture {
    #[serde(deserialize_with = "lenient::string")]
    pub overview: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub components: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub dependencies: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub files_to_create: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub files_to_modify: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub database_changes: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub api_endpoints: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub testing_strategy: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub deployment_steps: Vec<String>,
}

impl Architecture {
    /// The plan used when the Architect's output cannot be used.
    pub fn minimal(request: &str) -> Self {
        Self {
            overview: format!("Architecture for: {request}"),
            components: vec!["Main component".into()],
            testing_strategy: "Basic tests".into(),
            deployment_steps: vec!["Standard deployment".into()],
            ..Self::default()
        }
    }
}

/// The Coder's output: files plus the commands needed to install them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeBundle {
    /// File path → file content
    #[serde(deserialize_with = "lenient::string_map")]
    pub files: BTreeMap<String, String>,
    #[serde(
        rename = "installation_commands",
        alias = "install_commands",
        deserialize_with = "lenient::string_list"
    )]
    pub install_commands: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub setup_instructions: Vec<String>,
}

impl CodeBundle {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.install_commands.is_empty()
    }
}

/// The Reviewer's verdict. `approved` is the only gate to deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub approved: bool,
    /// 0–10
    pub score: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub security_check: String,
    #[serde(default)]
    pub performance_check: String,
    #[serde(default)]
    pub compatibility_check: String,
}

impl ReviewVerdict {
    /// The verdict used when the Reviewer's output cannot be used.
    pub fn rejected(issue: impl Into<String>) -> Self {
        Self {
            approved: false,
            score: 0,
            issues: vec![issue.into()],
            security_check: "failed".into(),
            performance_check: "failed".into(),
            compatibility_check: "failed".into(),
            ..Self::default()
        }
    }
}

// ── Deployment ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Success,
    Failed,
}

/// One install command and what it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command: String,
    /// Process exit code; -1 when the process never produced one.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// A file the Deployer could not write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFailure {
    pub path: String,
    pub error: String,
}

/// What happened with the version-control commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    /// No version-control collaborator configured
    Disabled,
    Committed,
    /// The collaborator ran but reported nothing committed
    NotCommitted,
    Failed { error: String },
}

/// Everything the Deployer did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub files_written: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_failures: Vec<WriteFailure>,
    pub commands: Vec<CommandOutcome>,
    pub commit: CommitOutcome,
    pub status: DeploymentStatus,
}

// ── Audit trail ─────────────────────────────────────────────────────────────

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Requested,
    Planned,
    Implemented,
    Reviewed,
    Deployed,
    Rejected,
    Aborted,
    Recorded,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Requested => "requested",
            Stage::Planned => "planned",
            Stage::Implemented => "implemented",
            Stage::Reviewed => "reviewed",
            Stage::Deployed => "deployed",
            Stage::Rejected => "rejected",
            Stage::Aborted => "aborted",
            Stage::Recorded => "recorded",
        };
        f.write_str(name)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Deployed,
    Rejected,
    Aborted,
}

impl From<Outcome> for Stage {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Deployed => Stage::Deployed,
            Outcome::Rejected => Stage::Rejected,
            Outcome::Aborted => Stage::Aborted,
        }
    }
}

/// A state the run passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: Stage,
    pub at: DateTime<Utc>,
}

/// The immutable result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionRecord {
    pub id: String,
    pub request: FeatureRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentResult>,
    pub outcome: Outcome,
    pub success: bool,
    /// A human must fix credentials or permissions before retrying.
    #[serde(default)]
    pub action_required: bool,
    /// The reviewer's issues when the run was rejected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejection_reasons: Vec<String>,
    /// Raw error text when the run was aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stages: Vec<StageTransition>,
    pub timestamp: DateTime<Utc>,
}

/// One scheduled run of discovery plus pipeline submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionCycle {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Step names in the order they ran
    pub steps: Vec<String>,
    /// Ids of the construction records this cycle produced
    pub records: Vec<String>,
    pub errors: Vec<String>,
    /// System state observed when the cycle began
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EvolutionCycle {
    pub fn begin(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            steps: Vec::new(),
            records: Vec::new(),
            errors: Vec::new(),
            snapshot: None,
            completed_at: None,
        }
    }
}

/// Forgiving deserializers for model-produced fields.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn text(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
        let value = Value::deserialize(de)?;
        Ok(match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(text)
                .collect::<Vec<_>>()
                .join("\n"),
            other => text(other).unwrap_or_default(),
        })
    }

    pub fn string_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
        let value = Value::deserialize(de)?;
        Ok(match value {
            Value::Array(items) => items.into_iter().filter_map(text).collect(),
            Value::Null => Vec::new(),
            other => text(other).into_iter().collect(),
        })
    }

    pub fn string_map<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        let value = Value::deserialize(de)?;
        match value {
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, text(v).unwrap_or_default()))
                .collect()),
            Value::Null => Ok(BTreeMap::new()),
            _ => Err(serde::de::Error::custom("expected an object of path → content")),
        }
    }
}
