//! Provider fallback — one bounded retry against a terminal backend.
//!
//! The primary is called with a per-call timeout. If it fails (error or
//! timeout) and a fallback is configured, the fallback gets exactly one
//! attempt under the same timeout. There is never a second hop.

use async_trait::async_trait;
use autoforge_core::error::ProviderError;
use autoforge_core::event::{DomainEvent, EventBus};
use autoforge_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that wraps a primary backend and an optional terminal backend.
pub struct FallbackProvider {
    primary: Arc<dyn Provider>,
    fallback: Option<Arc<dyn Provider>>,
    timeout: Duration,
    events: Option<Arc<EventBus>>,
}

impl FallbackProvider {
    /// Wrap `primary`, bounding every call by `timeout`.
    pub fn new(primary: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback: None,
            timeout,
            events: None,
        }
    }

    /// Retry once against `fallback` when the primary fails.
    ///
    /// A fallback with the primary's own name is ignored.
    pub fn with_fallback(mut self, fallback: Arc<dyn Provider>) -> Self {
        if fallback.name() != self.primary.name() {
            self.fallback = Some(fallback);
        }
        self
    }

    /// Publish a `ProviderFallback` event on every hop.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    async fn attempt(
        &self,
        provider: &Arc<dyn Provider>,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "Provider '{}' timed out after {}s",
                provider.name(),
                self.timeout.as_secs_f64()
            ))),
        }
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let primary_error = match self.attempt(&self.primary, request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            warn!(provider = %self.primary.name(), error = %primary_error, "Provider failed, no fallback available");
            return Err(primary_error);
        };

        warn!(
            provider = %self.primary.name(),
            fallback = %fallback.name(),
            error = %primary_error,
            "Provider failed, falling back"
        );
        if let Some(events) = &self.events {
            events.publish(DomainEvent::ProviderFallback {
                from: self.primary.name().to_string(),
                to: fallback.name().to_string(),
                error: primary_error.to_string(),
                timestamp: chrono::Utc::now(),
            });
        }

        match self.attempt(fallback, request).await {
            Ok(response) => {
                info!(fallback = %fallback.name(), "Fallback provider succeeded");
                Ok(response)
            }
            Err(fallback_error) => Err(ProviderError::FallbackExhausted {
                primary_id: self.primary.name().to_string(),
                primary: Box::new(primary_error),
                fallback_id: fallback.name().to_string(),
                fallback: Box::new(fallback_error),
            }),
        }
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        if let Ok(true) = self.primary.health_check().await {
            return Ok(true);
        }
        match &self.fallback {
            Some(fallback) => Ok(matches!(fallback.health_check().await, Ok(true))),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A mock provider that always fails.
    struct FailingProvider {
        name: String,
        error: ProviderError,
        call_count: Mutex<usize>,
    }

    impl FailingProvider {
        fn new(name: &str, error: ProviderError) -> Self {
            Self {
                name: name.into(),
                error,
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Err(self.error.clone())
        }
    }

    /// A mock provider that always succeeds.
    struct SuccessProvider {
        name: String,
        call_count: Mutex<usize>,
    }

    impl SuccessProvider {
        fn new(name: &str) -> Self {
            Self {
                name: name.into(),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for SuccessProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            Ok(ProviderResponse {
                content: format!("success from {}", self.name),
                model: "test-model".into(),
                usage: None,
            })
        }
    }

    /// A mock provider that hangs forever (for timeout testing).
    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderError::Timeout("unreachable".into()))
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn primary_succeeds_without_hop() {
        let p1 = Arc::new(SuccessProvider::new("openai"));
        let p2 = Arc::new(SuccessProvider::new("ollama"));

        let provider = FallbackProvider::new(p1.clone(), TIMEOUT).with_fallback(p2.clone());

        let result = provider.complete(ProviderRequest::new("hello")).await.unwrap();
        assert_eq!(result.content, "success from openai");
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_once_on_failure() {
        let p1 = Arc::new(FailingProvider::new(
            "openai",
            ProviderError::ApiError {
                status_code: 500,
                message: "Internal Server Error".into(),
            },
        ));
        let p2 = Arc::new(SuccessProvider::new("ollama"));
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();

        let provider = FallbackProvider::new(p1.clone(), TIMEOUT)
            .with_fallback(p2.clone())
            .with_events(bus);

        let result = provider.complete(ProviderRequest::new("hello")).await.unwrap();
        assert_eq!(result.content, "success from ollama");
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "provider_fallback");
    }

    #[tokio::test]
    async fn both_fail_reports_both_errors() {
        let p1 = Arc::new(FailingProvider::new(
            "openai",
            ProviderError::ApiError {
                status_code: 403,
                message: "forbidden".into(),
            },
        ));
        let p2 = Arc::new(FailingProvider::new(
            "ollama",
            ProviderError::Network("connection refused".into()),
        ));

        let provider = FallbackProvider::new(p1.clone(), TIMEOUT).with_fallback(p2.clone());

        let err = provider.complete(ProviderRequest::new("hello")).await.unwrap_err();
        match &err {
            ProviderError::FallbackExhausted {
                primary_id,
                fallback_id,
                ..
            } => {
                assert_eq!(primary_id, "openai");
                assert_eq!(fallback_id, "ollama");
            }
            other => panic!("Expected FallbackExhausted, got: {other:?}"),
        }
        assert!(err.is_authorization());
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn no_fallback_returns_primary_error() {
        let p1 = Arc::new(FailingProvider::new(
            "ollama",
            ProviderError::Network("down".into()),
        ));
        let provider = FallbackProvider::new(p1.clone(), TIMEOUT);

        let err = provider.complete(ProviderRequest::new("hello")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
        assert_eq!(p1.calls(), 1);
    }

    #[tokio::test]
    async fn fallback_to_self_is_ignored() {
        let p1 = Arc::new(FailingProvider::new(
            "ollama",
            ProviderError::Network("down".into()),
        ));
        let provider = FallbackProvider::new(p1.clone(), TIMEOUT).with_fallback(p1.clone());

        assert!(provider.complete(ProviderRequest::new("hello")).await.is_err());
        assert_eq!(p1.calls(), 1);
    }

    #[tokio::test]
    async fn timeout_triggers_fallback() {
        let p2 = Arc::new(SuccessProvider::new("ollama"));

        let provider = FallbackProvider::new(Arc::new(HangingProvider), Duration::from_millis(50))
            .with_fallback(p2.clone());

        let result = provider.complete(ProviderRequest::new("hello")).await;
        assert!(result.is_ok());
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn health_check_any_healthy() {
        let p1 = Arc::new(FailingProvider::new(
            "bad",
            ProviderError::Network("down".into()),
        ));
        let p2 = Arc::new(SuccessProvider::new("good"));

        let provider = FallbackProvider::new(p1, TIMEOUT).with_fallback(p2);
        assert!(provider.health_check().await.unwrap());
    }
}
