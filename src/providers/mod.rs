//! Generative backends and the fallback router
//!
//! Every backend (hosted API, local model) sits behind the same
//! [`GenerativeBackend`] trait: take a prompt, return text or a
//! [`ProviderError`]. Which backends are tried, in what order and how often is
//! decided by [`router::ProviderRouter`] from a per-request snapshot of
//! [`ProviderDescriptor`]s.
//!
//! Concrete network clients are not part of this crate; callers register
//! their own implementations.
//!
//! # Example
//!
//! ```rust
//! use biomind::providers::{GenerativeBackend, Prompt, PromptMessage, PromptRole};
//! use std::time::Duration;
//!
//! async fn example(backend: &dyn GenerativeBackend) {
//!     let prompt = Prompt::new(vec![
//!         PromptMessage::new(PromptRole::System, "You are a molecular biology assistant"),
//!         PromptMessage::new(PromptRole::User, "What is a PAM site?"),
//!     ]);
//!
//!     let text = backend.generate(&prompt, Duration::from_secs(30)).await.unwrap();
//!     println!("{text}");
//! }
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod error;
#[cfg(test)]
pub mod mock;
pub mod router;

pub use error::ProviderError;
pub use router::{BackoffPolicy, Generated, ProviderFailure, ProviderRouter, RouterError};

/// Stable identifier of a generative backend ("openai", "ollama", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Role of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// Instructions shaping the answer
    System,
    User,
    Assistant,
}

impl PromptRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptRole::System => "system",
            PromptRole::User => "user",
            PromptRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for PromptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered chat-style prompt handed to a backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub messages: Vec<PromptMessage>,
}

impl Prompt {
    pub fn new(messages: Vec<PromptMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, role: PromptRole, content: impl Into<String>) {
        self.messages.push(PromptMessage::new(role, content));
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == PromptRole::User)
            .map(|m| m.content.as_str())
    }
}

/// A backend that turns a prompt into text.
///
/// Implementations must be Send + Sync; the router shares them across
/// concurrent requests.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generates a completion. `timeout` is the attempt budget the router
    /// enforces; backends may pass it on to their transport.
    async fn generate(&self, prompt: &Prompt, timeout: Duration) -> Result<String, ProviderError>;

    /// Identifier this backend is registered under
    fn provider_id(&self) -> ProviderId;
}

/// Routing parameters of one provider. Snapshotted per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    /// Lower is tried first
    pub priority: u32,
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(
        with = "duration_ms",
        rename = "per_attempt_timeout_ms",
        default = "default_attempt_timeout"
    )]
    pub per_attempt_timeout: Duration,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ProviderDescriptor {
    pub fn new(id: impl Into<ProviderId>, priority: u32) -> Self {
        Self {
            id: id.into(),
            priority,
            max_retries: default_max_retries(),
            per_attempt_timeout: default_attempt_timeout(),
            enabled: true,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = timeout;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Total attempts this provider gets
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_enabled() -> bool {
    true
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
