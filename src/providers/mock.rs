//! Scripted backend for unit tests
//!
//! Replays a queue of outcomes, one per `generate` call, then falls back to a
//! fixed outcome. Counts calls and keeps the last prompt for verification.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::providers::{GenerativeBackend, Prompt, ProviderError, ProviderId};

pub struct MockBackend {
    id: ProviderId,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Mutex<Result<String, ProviderError>>,
    delay: Option<Duration>,
    call_count: Mutex<usize>,
    last_prompt: Mutex<Option<Prompt>>,
}

impl MockBackend {
    pub fn new(id: impl Into<ProviderId>) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok("Mock response".to_string())),
            delay: None,
            call_count: Mutex::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Backend that fails every call with `error`
    pub fn failing(id: impl Into<ProviderId>, error: ProviderError) -> Self {
        let mock = Self::new(id);
        mock.set_error(error);
        mock
    }

    /// Backend that answers every call with `text`
    pub fn answering(id: impl Into<ProviderId>, text: impl Into<String>) -> Self {
        let mock = Self::new(id);
        mock.set_response(text);
        mock
    }

    /// Sleeps this long before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues one outcome ahead of the fallback
    pub fn push(&self, outcome: Result<String, ProviderError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn set_response(&self, text: impl Into<String>) {
        *self.fallback.lock().unwrap() = Ok(text.into());
    }

    pub fn set_error(&self, error: ProviderError) {
        *self.fallback.lock().unwrap() = Err(error);
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate(&self, prompt: &Prompt, _timeout: Duration) -> Result<String, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }

    fn provider_id(&self) -> ProviderId {
        self.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::PromptRole;

    #[tokio::test]
    async fn test_mock_backend_script_then_fallback() {
        let mock = MockBackend::answering("p", "steady");
        mock.push(Err(ProviderError::network("blip")));

        let mut prompt = Prompt::default();
        prompt.push(PromptRole::User, "Hi");

        assert!(mock.generate(&prompt, Duration::from_secs(1)).await.is_err());
        assert_eq!(
            mock.generate(&prompt, Duration::from_secs(1)).await.unwrap(),
            "steady"
        );
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.last_prompt().unwrap().last_user_message(), Some("Hi"));
    }

    #[test]
    fn test_mock_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockBackend>();
    }
}
