//! Model router — picks a backend for a piece of work and invokes it.
//!
//! Selection is a pure function of the context text and the registered
//! profiles. Invocation goes through [`FallbackProvider`] so every call is
//! bounded by a timeout and gets at most one hop to the terminal backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use autoforge_config::{AppConfig, RouterConfig};
use autoforge_core::error::{Error, ProviderError};
use autoforge_core::event::EventBus;
use autoforge_core::provider::{Provider, ProviderProfile, ProviderRequest};
use tracing::{debug, info};
use crate::fallback::FallbackProvider;
use crate::openai_compat::{OpenAiCompatProvider, default_base_url, default_model};

struct Backend {
    provider: Arc<dyn Provider>,
    profile: ProviderProfile,
}

/// Routes prompts to one of several interchangeable backends.
pub struct ModelRouter {
    backends: HashMap<String, Backend>,
    policy: RouterConfig,
    /// Where every fallback hop lands.
    terminal: String,
    timeout: Duration,
    events: Option<Arc<EventBus>>,
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .field("terminal", &self.terminal)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelRouter {
    /// Build a router over `backends`.
    ///
    /// Fails with `InvalidConfig` when no backend is usable (no credentialed
    /// remote and no local backend).
    pub fn new(
        policy: RouterConfig,
        backends: Vec<(Arc<dyn Provider>, ProviderProfile)>,
    ) -> Result<Self, Error> {
        let backends: HashMap<String, Backend> = backends
            .into_iter()
            .map(|(provider, profile)| (profile.id.clone(), Backend { provider, profile }))
            .collect();

        let terminal = match backends.get(&policy.local_provider) {
            Some(local) if local.profile.is_usable() => local.profile.id.clone(),
            _ => backends
                .values()
                .filter(|b| b.profile.is_usable())
                .min_by(|a, b| {
                    (a.profile.priority, &a.profile.id).cmp(&(b.profile.priority, &b.profile.id))
                })
                .map(|b| b.profile.id.clone())
                .ok_or_else(|| {
                    Error::InvalidConfig(
                        "no usable model backend: configure an API key or a local provider"
                            .into(),
                    )
                })?,
        };

        let timeout = policy.call_timeout();
        Ok(Self {
            backends,
            policy,
            terminal,
            timeout,
            events: None,
        })
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Publish `ProviderFallback` events on this bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// The backend every fallback hop lands on.
    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    /// Registered profiles, best rank first.
    pub fn profiles(&self) -> Vec<ProviderProfile> {
        let mut profiles: Vec<ProviderProfile> =
            self.backends.values().map(|b| b.profile.clone()).collect();
        profiles.sort_by(|a, b| (a.priority, &a.id).cmp(&(b.priority, &b.id)));
        profiles
    }

    fn is_usable(&self, id: &str) -> bool {
        self.backends.get(id).is_some_and(|b| b.profile.is_usable())
    }

    fn mentions_any(context: &str, keywords: &[String]) -> bool {
        keywords
            .iter()
            .any(|k| !k.is_empty() && context.contains(&k.to_lowercase()))
    }

    /// Pick the backend for work described by `context`.
    pub fn select(&self, context: &str) -> String {
        let context = context.to_lowercase();

        if Self::mentions_any(&context, &self.policy.urgent_keywords) {
            let chosen = self
                .policy
                .premium_order
                .iter()
                .find(|id| self.is_usable(id))
                .cloned()
                .unwrap_or_else(|| self.terminal.clone());
            debug!(provider = %chosen, "Routing urgent work to premium backend");
            return chosen;
        }

        if Self::mentions_any(&context, &self.policy.routine_keywords) {
            debug!(provider = %self.terminal, "Routing routine work to local backend");
            return self.terminal.clone();
        }

        if self.is_usable(&self.policy.default_provider) {
            return self.policy.default_provider.clone();
        }

        self.profiles()
            .into_iter()
            .find(|p| p.is_usable() && !p.is_local)
            .map(|p| p.id)
            .unwrap_or_else(|| self.terminal.clone())
    }

    /// Send `prompt` to `provider_id`, falling back once to the terminal
    /// backend on failure.
    pub async fn invoke(&self, provider_id: &str, prompt: &str) -> Result<String, ProviderError> {
        let backend = self
            .backends
            .get(provider_id)
            .ok_or_else(|| ProviderError::NotConfigured(provider_id.to_string()))?;

        let mut provider = FallbackProvider::new(backend.provider.clone(), self.timeout);
        if provider_id != self.terminal
            && let Some(terminal) = self.backends.get(&self.terminal)
        {
            provider = provider.with_fallback(terminal.provider.clone());
        }
        if let Some(events) = &self.events {
            provider = provider.with_events(events.clone());
        }

        let mut request = ProviderRequest::new(prompt);
        request.max_tokens = Some(self.policy.max_tokens);

        let response = provider.complete(request).await?;
        debug!(provider = provider_id, model = %response.model, chars = response.content.len(), "Backend responded");
        Ok(response.content)
    }

    /// `invoke(select(context), prompt)`.
    pub async fn route(&self, prompt: &str, context: &str) -> Result<String, ProviderError> {
        let provider_id = self.select(context);
        self.invoke(&provider_id, prompt).await
    }
}

/// Build a router from configuration.
///
/// Every configured provider is registered so it shows up in `profiles()`;
/// only credentialed ones (and the local backend) are ever selected.
pub fn build_from_config(config: &AppConfig) -> Result<ModelRouter, Error> {
    let mut backends: Vec<(Arc<dyn Provider>, ProviderProfile)> = Vec::new();

    for (name, provider_config) in &config.providers {
        let is_local = *name == config.router.local_provider;
        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));
        let model = provider_config
            .model
            .clone()
            .unwrap_or_else(|| default_model(name));
        let api_key = provider_config.api_key.clone().unwrap_or_else(|| {
            if is_local { name.clone() } else { String::new() }
        });

        let provider: Arc<dyn Provider> =
            Arc::new(OpenAiCompatProvider::new(name, &base_url, api_key, model));
        let profile = ProviderProfile {
            id: name.clone(),
            has_credentials: provider_config.has_api_key(),
            priority: provider_config.priority,
            is_local,
        };
        backends.push((provider, profile));
    }

    let router = ModelRouter::new(config.router.clone(), backends)?;
    info!(
        backends = router.backends.len(),
        terminal = %router.terminal,
        "Model router ready"
    );
    Ok(router)
}
