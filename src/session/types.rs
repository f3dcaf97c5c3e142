use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::ClassificationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    /// User-safe failure message (denial or routing failure)
    Error,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::Error => "error",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self::new_at(role, content, Utc::now())
    }

    pub fn new_at(role: TurnRole, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
            classification: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Error, content)
    }

    pub fn with_classification(mut self, classification: ClassificationResult) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn is_error(&self) -> bool {
        self.role == TurnRole::Error
    }
}

/// Conversation state for one session key.
///
/// History is append-only. An expired session is replaced as a whole, never
/// trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub history: Vec<Turn>,
    pub topics: BTreeSet<String>,
    pub entities: BTreeSet<String>,
}

impl Session {
    pub fn new_at(key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            key: key.into(),
            created_at: now,
            last_active_at: now,
            history: Vec::new(),
            topics: BTreeSet::new(),
            entities: BTreeSet::new(),
        }
    }

    /// Idle for strictly longer than `idle_timeout`
    pub fn is_expired_at(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now.signed_duration_since(self.last_active_at) > idle_timeout
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_active_at {
            self.last_active_at = now;
        }
    }

    /// The last `n` turns in insertion order
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let now = Utc::now();
        let session = Session::new_at("caller-1", now);
        assert_eq!(session.key, "caller-1");
        assert_eq!(session.created_at, now);
        assert!(session.history.is_empty());
        assert!(Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn test_expiry_is_strict() {
        let start = Utc::now();
        let session = Session::new_at("k", start);
        let idle = Duration::minutes(30);
        assert!(!session.is_expired_at(start + Duration::minutes(30), idle));
        assert!(session.is_expired_at(start + Duration::minutes(31), idle));
    }

    #[test]
    fn test_recent_turns() {
        let mut session = Session::new_at("k", Utc::now());
        for i in 0..5 {
            session.history.push(Turn::user(format!("m{i}")));
        }
        let recent = session.recent_turns(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "m3");
        assert_eq!(recent[1].content, "m4");
        assert_eq!(session.recent_turns(50).len(), 5);
    }

    #[test]
    fn test_serialization() {
        let session = Session::new_at("k", Utc::now());
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("last_active_at"));
        assert!(json.contains("history"));

        let turn = Turn::error("quota");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"error\""));
        assert!(!json.contains("classification"));
    }
}
