//! Ordered fallback over generative backends
//!
//! For one prompt the router walks the eligible providers in priority order.
//! Each provider gets `max_retries + 1` attempts, every attempt bounded by the
//! provider's timeout, with backoff between attempts. The first success wins.
//! A provider that has used its attempts is never revisited.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::providers::{GenerativeBackend, Prompt, ProviderDescriptor, ProviderError, ProviderId};

/// Delay schedule between attempts on the same provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    #[serde(with = "super::duration_ms", rename = "initial_delay_ms")]
    pub initial_delay: Duration,
    #[serde(with = "super::duration_ms", rename = "max_delay_ms")]
    pub max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
        }
    }

    /// Delay before retry number `retry` (1-based): doubles each time, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_secs(10))
    }
}

/// A successful generation
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub provider: ProviderId,
    pub text: String,
    /// Attempts made on the winning provider
    pub attempts: u32,
}

/// Final state of a provider that never succeeded
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub attempts: u32,
    pub last_error: ProviderError,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("No eligible provider for this request")]
    NoEligibleProvider,

    #[error("All {} providers failed", .failures.len())]
    AllProvidersFailed {
        /// One entry per attempted provider, in attempt order
        failures: Vec<ProviderFailure>,
    },

    #[error("Request cancelled")]
    Cancelled,
}

impl RouterError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            RouterError::NoEligibleProvider => "no_eligible_provider",
            RouterError::AllProvidersFailed { .. } => "all_providers_failed",
            RouterError::Cancelled => "cancelled",
        }
    }
}

enum Exhausted {
    Failed(ProviderFailure),
    Cancelled,
}

/// Backend registry plus the retry policy. Holds no per-request state, so one
/// router serves concurrent requests.
#[derive(Clone, Default)]
pub struct ProviderRouter {
    backends: HashMap<ProviderId, Arc<dyn GenerativeBackend>>,
    backoff: BackoffPolicy,
}

impl ProviderRouter {
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self {
            backends: HashMap::new(),
            backoff,
        }
    }

    /// Registers a backend under its own provider id, replacing any previous
    /// backend with that id.
    pub fn register(&mut self, backend: Arc<dyn GenerativeBackend>) {
        let id = backend.provider_id();
        debug!(provider = %id, "Registered generative backend");
        self.backends.insert(id, backend);
    }

    pub fn with_backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.register(backend);
        self
    }

    pub fn has_backend(&self, id: &ProviderId) -> bool {
        self.backends.contains_key(id)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Enabled, tier-allowed, registered descriptors sorted by priority.
    /// Ties keep their snapshot order.
    pub fn candidates<'a>(
        &self,
        descriptors: &'a [ProviderDescriptor],
        allowed: &[ProviderId],
    ) -> Vec<&'a ProviderDescriptor> {
        let mut candidates: Vec<_> = descriptors
            .iter()
            .filter(|d| d.enabled && allowed.contains(&d.id) && self.has_backend(&d.id))
            .collect();
        candidates.sort_by_key(|d| d.priority);
        candidates
    }

    pub async fn route(
        &self,
        prompt: &Prompt,
        descriptors: &[ProviderDescriptor],
        allowed: &[ProviderId],
        cancel: &CancellationToken,
    ) -> Result<Generated, RouterError> {
        let candidates = self.candidates(descriptors, allowed);
        if candidates.is_empty() {
            warn!(
                configured = descriptors.len(),
                allowed = allowed.len(),
                "No eligible provider"
            );
            return Err(RouterError::NoEligibleProvider);
        }

        let mut failures = Vec::with_capacity(candidates.len());
        for descriptor in candidates {
            let Some(backend) = self.backends.get(&descriptor.id) else {
                continue;
            };
            match self.try_provider(backend.as_ref(), descriptor, prompt, cancel).await {
                Ok(generated) => {
                    info!(
                        provider = %generated.provider,
                        attempts = generated.attempts,
                        fallbacks = failures.len(),
                        "Generation succeeded"
                    );
                    return Ok(generated);
                }
                Err(Exhausted::Failed(failure)) => {
                    warn!(
                        provider = %failure.provider,
                        attempts = failure.attempts,
                        error = %failure.last_error,
                        "Provider exhausted, falling back"
                    );
                    failures.push(failure);
                }
                Err(Exhausted::Cancelled) => return Err(RouterError::Cancelled),
            }
        }

        Err(RouterError::AllProvidersFailed { failures })
    }

    async fn try_provider(
        &self,
        backend: &dyn GenerativeBackend,
        descriptor: &ProviderDescriptor,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<Generated, Exhausted> {
        let max_attempts = descriptor.attempts();
        let timeout = descriptor.per_attempt_timeout;
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(Exhausted::Cancelled);
            }
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Exhausted::Cancelled),
                result = tokio::time::timeout(timeout, backend.generate(prompt, timeout)) => result,
            };

            let error = match outcome {
                Ok(Ok(text)) => {
                    return Ok(Generated {
                        provider: descriptor.id.clone(),
                        text,
                        attempts: attempt,
                    });
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::timeout(timeout),
            };

            if !error.is_retryable() || attempt >= max_attempts {
                return Err(Exhausted::Failed(ProviderFailure {
                    provider: descriptor.id.clone(),
                    attempts: attempt,
                    last_error: error,
                }));
            }

            let delay = error
                .retry_after()
                .unwrap_or_else(|| self.backoff.delay_for(attempt))
                .min(self.backoff.max_delay);
            warn!(
                provider = %descriptor.id,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Generation attempt failed, retrying with backoff"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Exhausted::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockBackend;
    use crate::providers::PromptRole;

    fn fast_router() -> ProviderRouter {
        ProviderRouter::new(BackoffPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(5),
        ))
    }

    fn prompt() -> Prompt {
        let mut p = Prompt::default();
        p.push(PromptRole::User, "What is a PAM site?");
        p
    }

    fn ids(names: &[&str]) -> Vec<ProviderId> {
        names.iter().map(|n| ProviderId::new(*n)).collect()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_fallback_after_exhausting_retries() {
        let p1 = Arc::new(MockBackend::failing("p1", ProviderError::network("down")));
        let p2 = Arc::new(MockBackend::answering("p2", "answer"));
        let router = fast_router()
            .with_backend(p1.clone())
            .with_backend(p2.clone());

        let descriptors = vec![
            ProviderDescriptor::new("p2", 2).with_max_retries(1),
            ProviderDescriptor::new("p1", 1).with_max_retries(2),
        ];
        let result = router
            .route(&prompt(), &descriptors, &ids(&["p1", "p2"]), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.provider, ProviderId::new("p2"));
        assert_eq!(result.text, "answer");
        assert_eq!(result.attempts, 1);
        assert_eq!(p1.call_count(), 3);
        assert_eq!(p2.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_eligible_provider() {
        let router = fast_router().with_backend(Arc::new(MockBackend::new("p1")));
        let descriptors = vec![
            ProviderDescriptor::new("p1", 1).disabled(),
            ProviderDescriptor::new("p2", 2),
        ];
        // p1 disabled, p2 unregistered, p3 not configured
        let err = router
            .route(&prompt(), &descriptors, &ids(&["p1", "p2", "p3"]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, RouterError::NoEligibleProvider);

        let err = router
            .route(&prompt(), &[ProviderDescriptor::new("p1", 1)], &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, RouterError::NoEligibleProvider);
    }

    #[tokio::test]
    async fn test_all_providers_failed_reports_in_order() {
        let router = fast_router()
            .with_backend(Arc::new(MockBackend::failing("a", ProviderError::network("a down"))))
            .with_backend(Arc::new(MockBackend::failing(
                "b",
                ProviderError::timeout(Duration::from_secs(1)),
            )));
        let descriptors = vec![
            ProviderDescriptor::new("b", 5).with_max_retries(0),
            ProviderDescriptor::new("a", 1).with_max_retries(1),
        ];

        match router
            .route(&prompt(), &descriptors, &ids(&["a", "b"]), &CancellationToken::new())
            .await
        {
            Err(RouterError::AllProvidersFailed { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].provider, ProviderId::new("a"));
                assert_eq!(failures[0].attempts, 2);
                assert_eq!(failures[0].last_error, ProviderError::network("a down"));
                assert_eq!(failures[1].provider, ProviderId::new("b"));
                assert_eq!(failures[1].attempts, 1);
            }
            other => panic!("expected AllProvidersFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_error_moves_on_immediately() {
        let p1 = Arc::new(MockBackend::failing("p1", ProviderError::auth("bad key")));
        let p2 = Arc::new(MockBackend::answering("p2", "ok"));
        let router = fast_router()
            .with_backend(p1.clone())
            .with_backend(p2.clone());
        let descriptors = vec![
            ProviderDescriptor::new("p1", 1).with_max_retries(5),
            ProviderDescriptor::new("p2", 2),
        ];

        let result = router
            .route(&prompt(), &descriptors, &ids(&["p1", "p2"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderId::new("p2"));
        assert_eq!(p1.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_then_success_on_same_provider() {
        let p1 = Arc::new(MockBackend::answering("p1", "second time"));
        p1.push(Err(ProviderError::rate_limit("slow down", Some(Duration::from_millis(1)))));
        let router = fast_router().with_backend(p1.clone());

        let result = router
            .route(
                &prompt(),
                &[ProviderDescriptor::new("p1", 1).with_max_retries(1)],
                &ids(&["p1"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.attempts, 2);
        assert_eq!(result.text, "second time");
    }

    #[tokio::test]
    async fn test_attempt_timeout_counts_as_failure() {
        let slow = Arc::new(MockBackend::answering("slow", "late").with_delay(Duration::from_millis(200)));
        let fast = Arc::new(MockBackend::answering("fast", "on time"));
        let router = fast_router().with_backend(slow.clone()).with_backend(fast);
        let descriptors = vec![
            ProviderDescriptor::new("slow", 1)
                .with_max_retries(0)
                .with_timeout(Duration::from_millis(10)),
            ProviderDescriptor::new("fast", 2),
        ];

        let result = router
            .route(&prompt(), &descriptors, &ids(&["slow", "fast"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderId::new("fast"));
        assert_eq!(slow.call_count(), 1);
    }

    #[tokio::test]
    async fn test_priority_ties_keep_snapshot_order() {
        let router = fast_router()
            .with_backend(Arc::new(MockBackend::new("x")))
            .with_backend(Arc::new(MockBackend::new("y")));
        let descriptors = vec![ProviderDescriptor::new("y", 1), ProviderDescriptor::new("x", 1)];
        let order: Vec<_> = router
            .candidates(&descriptors, &ids(&["x", "y"]))
            .iter()
            .map(|d| d.id.as_str().to_string())
            .collect();
        assert_eq!(order, vec!["y", "x"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let backend = Arc::new(MockBackend::new("p1"));
        let router = fast_router().with_backend(backend.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = router
            .route(&prompt(), &[ProviderDescriptor::new("p1", 1)], &ids(&["p1"]), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, RouterError::Cancelled);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_during_attempt() {
        let backend = Arc::new(MockBackend::new("p1").with_delay(Duration::from_secs(5)));
        let router = fast_router().with_backend(backend);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = router
            .route(&prompt(), &[ProviderDescriptor::new("p1", 1)], &ids(&["p1"]), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, RouterError::Cancelled);
    }
}
