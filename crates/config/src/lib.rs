//! Configuration loading, validation, and management for Autoforge.
//!
//! Loads configuration from `~/.autoforge/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.autoforge/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model routing policy
    #[serde(default)]
    pub router: RouterConfig,

    /// Backend configurations, keyed by provider id. Declared entries
    /// replace the built-in entry of the same id; the rest are kept.
    #[serde(default = "default_providers", deserialize_with = "providers_over_defaults")]
    pub providers: HashMap<String, ProviderConfig>,

    /// Construction pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Evolution scheduler settings
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Search collaborator settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Persistence settings
    #[serde(default)]
    pub store: StoreConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("router", &self.router)
            .field("providers", &self.providers)
            .field("pipeline", &self.pipeline)
            .field("evolution", &self.evolution)
            .field("search", &self.search)
            .field("store", &self.store)
            .finish()
    }
}

// ── Router ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Provider used when no keyword rule applies
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// The local/offline backend every fallback terminates at
    #[serde(default = "default_local_provider")]
    pub local_provider: String,

    /// Ordering consulted for urgent or strategic work
    #[serde(default = "default_premium_order")]
    pub premium_order: Vec<String>,

    /// Keywords that route to the premium ordering
    #[serde(default = "default_urgent_keywords")]
    pub urgent_keywords: Vec<String>,

    /// Keywords that route straight to the local backend
    #[serde(default = "default_routine_keywords")]
    pub routine_keywords: Vec<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Max tokens requested per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String {
    "google".into()
}
fn default_local_provider() -> String {
    "ollama".into()
}
fn default_premium_order() -> Vec<String> {
    vec!["openai".into(), "google".into(), "groq".into()]
}
fn default_urgent_keywords() -> Vec<String> {
    ["urgent", "urgente", "strategy", "strategic", "estratégia", "critical"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_routine_keywords() -> Vec<String> {
    ["routine", "rotina", "basic information", "informação básica"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_call_timeout() -> u64 {
    120
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            local_provider: default_local_provider(),
            premium_order: default_premium_order(),
            urgent_keywords: default_urgent_keywords(),
            routine_keywords: default_routine_keywords(),
            call_timeout_secs: default_call_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl RouterConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

// ── Providers ───────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Lower is preferred in the fallback ordering
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_priority() -> u32 {
    50
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("priority", &self.priority)
            .finish()
    }
}

impl ProviderConfig {
    fn ranked(priority: u32) -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: None,
            priority,
        }
    }

    /// A non-empty credential is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

fn default_providers() -> HashMap<String, ProviderConfig> {
    HashMap::from([
        ("google".to_string(), ProviderConfig::ranked(10)),
        ("openai".to_string(), ProviderConfig::ranked(20)),
        ("groq".to_string(), ProviderConfig::ranked(30)),
        ("ollama".to_string(), ProviderConfig::ranked(100)),
    ])
}

fn providers_over_defaults<'de, D>(deserializer: D) -> Result<HashMap<String, ProviderConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let declared = HashMap::<String, ProviderConfig>::deserialize(deserializer)?;
    let mut providers = default_providers();
    providers.extend(declared);
    Ok(providers)
}

// ── Pipeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory deployed files are written under
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Per install-command timeout in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// If non-empty, only these base commands may run during deployment
    #[serde(default)]
    pub allowed_commands: Vec<String>,

    /// Gather search context for the Architect and Coder
    #[serde(default = "default_true")]
    pub search_context: bool,

    /// Commit deployed files to version control
    #[serde(default = "default_true")]
    pub commit: bool,
}

fn default_workspace_root() -> PathBuf {
    AppConfig::workspace_dir()
}
fn default_command_timeout() -> u64 {
    300
}
fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            command_timeout_secs: default_command_timeout(),
            allowed_commands: vec![],
            search_context: true,
            commit: true,
        }
    }
}

impl PipelineConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

// ── Evolution ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Start the scheduler with the daemon
    #[serde(default)]
    pub enabled: bool,

    /// Minimum seconds between two cycles
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Cycle cap per calendar day (UTC)
    #[serde(default = "default_max_daily_cycles")]
    pub max_daily_cycles: u32,

    /// Candidates submitted to the pipeline per cycle
    #[serde(default = "default_candidates_per_cycle")]
    pub max_candidates_per_cycle: usize,

    /// Topics searched for improvement ideas
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    /// Search hits kept per topic
    #[serde(default = "default_results_per_topic")]
    pub results_per_topic: usize,

    /// Characters of fetched content kept per hit
    #[serde(default = "default_content_chars")]
    pub content_chars: usize,

    /// Seconds to sleep after a cycle that recorded errors
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    /// Seconds between gate checks
    #[serde(default = "default_tick")]
    pub tick_secs: u64,
}

fn default_interval() -> u64 {
    3600
}
fn default_max_daily_cycles() -> u32 {
    5
}
fn default_candidates_per_cycle() -> usize {
    2
}
fn default_topics() -> Vec<String> {
    [
        "python new features",
        "AI agent best practices",
        "web service optimization",
        "database client updates",
        "automation trends",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_results_per_topic() -> usize {
    2
}
fn default_content_chars() -> usize {
    1000
}
fn default_error_backoff() -> u64 {
    300
}
fn default_tick() -> u64 {
    60
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            max_daily_cycles: default_max_daily_cycles(),
            max_candidates_per_cycle: default_candidates_per_cycle(),
            topics: default_topics(),
            results_per_topic: default_results_per_topic(),
            content_chars: default_content_chars(),
            error_backoff_secs: default_error_backoff(),
            tick_secs: default_tick(),
        }
    }
}

impl EvolutionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

// ── Search / Store ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of a SearxNG-compatible JSON search API; unset disables search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

fn default_search_timeout() -> u64 {
    15
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_search_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSONL file per collection
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    /// Bound on each record write; a slower write is abandoned with a warning
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    /// Records and cycles kept in memory, and in the in-memory fallback store
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_store_dir() -> PathBuf {
    AppConfig::config_dir().join("records")
}

fn default_write_timeout() -> u64 {
    10
}

fn default_history_capacity() -> usize {
    1000
}

impl StoreConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            write_timeout_secs: default_write_timeout(),
            history_capacity: default_history_capacity(),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

/// Environment variables that fill unset provider credentials.
const CREDENTIAL_VARS: &[(&str, &[&str])] = &[
    ("openai", &["OPENAI_API_KEY"]),
    ("google", &["GOOGLE_API_KEY", "GEMINI_API_KEY"]),
    ("groq", &["GROQ_API_KEY"]),
];

impl AppConfig {
    /// Load configuration from the default path (~/.autoforge/config.toml).
    ///
    /// Also checks environment variables:
    /// - `AUTOFORGE_PROVIDER` overrides the default provider
    /// - `OPENAI_API_KEY`, `GOOGLE_API_KEY`/`GEMINI_API_KEY`, `GROQ_API_KEY`
    ///   fill provider keys the file leaves unset
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup("AUTOFORGE_PROVIDER") {
            self.router.default_provider = provider;
        }

        for (provider, vars) in CREDENTIAL_VARS {
            let Some(key) = vars.iter().find_map(|v| lookup(v)) else {
                continue;
            };
            let entry = self
                .providers
                .entry((*provider).to_string())
                .or_insert_with(|| ProviderConfig::ranked(default_priority()));
            if !entry.has_api_key() {
                entry.api_key = Some(key);
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".autoforge")
    }

    /// Get the workspace directory path.
    pub fn workspace_dir() -> PathBuf {
        Self::config_dir().join("workspace")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router.call_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "router.call_timeout_secs must be > 0".into(),
            ));
        }

        if self.evolution.max_daily_cycles == 0 {
            return Err(ConfigError::ValidationError(
                "evolution.max_daily_cycles must be > 0".into(),
            ));
        }

        if self.evolution.tick_secs == 0 {
            return Err(ConfigError::ValidationError(
                "evolution.tick_secs must be > 0".into(),
            ));
        }

        if self.pipeline.command_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.command_timeout_secs must be > 0".into(),
            ));
        }

        if self.store.write_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "store.write_timeout_secs must be > 0".into(),
            ));
        }

        if self.store.history_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "store.history_capacity must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            providers: default_providers(),
            pipeline: PipelineConfig::default(),
            evolution: EvolutionConfig::default(),
            search: SearchConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.router.local_provider, "ollama");
        assert_eq!(config.evolution.max_daily_cycles, 5);
        assert_eq!(config.evolution.max_candidates_per_cycle, 2);
        assert!(config.providers.contains_key("ollama"));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.router.default_provider, config.router.default_provider);
        assert_eq!(parsed.evolution.interval_secs, config.evolution.interval_secs);
    }

    #[test]
    fn zero_daily_cap_rejected() {
        let mut config = AppConfig::default();
        config.evolution.max_daily_cycles = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.router.default_provider, "google");
    }

    #[test]
    fn load_from_file_with_provider_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[router]
default_provider = "openai"
call_timeout_secs = 30

[providers.openai]
api_key = "sk-test"
priority = 1

[evolution]
interval_secs = 60
topics = ["rust async"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.router.default_provider, "openai");
        assert_eq!(config.router.call_timeout_secs, 30);
        assert!(config.providers["openai"].has_api_key());
        assert_eq!(config.providers["openai"].priority, 1);
        assert_eq!(config.evolution.topics, vec!["rust async".to_string()]);
        // Untouched sections keep their defaults
        assert_eq!(config.evolution.max_daily_cycles, 5);
    }

    #[test]
    fn declared_providers_keep_the_builtin_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[providers.openai]
api_key = "sk-test"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert!(config.providers["openai"].has_api_key());
        assert!(config.providers.contains_key("ollama"));
        assert!(config.providers.contains_key("google"));
        assert!(config.providers.contains_key("groq"));
    }

    #[test]
    fn zero_store_bounds_rejected() {
        let mut config = AppConfig::default();
        config.store.write_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.store.history_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "router = 5").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_fills_missing_keys_only() {
        let mut config = AppConfig::default();
        config.providers.get_mut("openai").unwrap().api_key = Some("from-file".into());

        config.apply_env(|name| match name {
            "OPENAI_API_KEY" => Some("from-env".into()),
            "GEMINI_API_KEY" => Some("gemini-env".into()),
            "AUTOFORGE_PROVIDER" => Some("groq".into()),
            _ => None,
        });

        assert_eq!(config.providers["openai"].api_key.as_deref(), Some("from-file"));
        assert_eq!(config.providers["google"].api_key.as_deref(), Some("gemini-env"));
        assert!(!config.providers["groq"].has_api_key());
        assert_eq!(config.router.default_provider, "groq");
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = AppConfig::default();
        config.providers.get_mut("openai").unwrap().api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("ollama"));
        assert!(toml_str.contains("max_daily_cycles"));
    }
}
