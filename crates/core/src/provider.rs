//! Provider trait — the abstraction over language-model backends.
//!
//! A Provider knows how to send a prompt to a model and get the raw text back.
//! Implementations: OpenAI-compatible endpoints (OpenAI, Groq, Google, Ollama).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// A single prompt sent to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Model override; `None` uses the backend's configured model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Optional system instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// The prompt text.
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            system: None,
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A complete response from a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The raw generated text
    pub content: String,

    /// Which model actually responded
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The router calls `complete()` without knowing which backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Whether the provider is reachable.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// How the router sees one registered backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Backend id (e.g., "openai")
    pub id: String,

    /// Whether an API credential is present
    pub has_credentials: bool,

    /// Priority rank; lower is tried first
    pub priority: u32,

    /// Local/offline backend that needs no credential
    #[serde(default)]
    pub is_local: bool,
}

impl ProviderProfile {
    /// Local backends are always usable; remote ones need a credential.
    pub fn is_usable(&self) -> bool {
        self.is_local || self.has_credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_request_defaults() {
        let req = ProviderRequest::new("hello");
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.model.is_none());
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn local_profile_is_usable_without_credentials() {
        let local = ProviderProfile {
            id: "ollama".into(),
            has_credentials: false,
            priority: 99,
            is_local: true,
        };
        let remote = ProviderProfile {
            id: "openai".into(),
            has_credentials: false,
            priority: 1,
            is_local: false,
        };
        assert!(local.is_usable());
        assert!(!remote.is_usable());
    }
}
