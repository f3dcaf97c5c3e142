use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::access::{AccessGate, ExemptCallers, TierLimits};
use crate::analysis::{DEFAULT_PAM, Organism, SequenceAnalyzer};
use crate::orchestrator::{DEFAULT_HISTORY_WINDOW, RequestContext};
use crate::providers::{BackoffPolicy, ProviderDescriptor, ProviderId};
use crate::session::manager::DEFAULT_IDLE_TIMEOUT_MINUTES;
use crate::utils::{BioMindError, Result};

/// Longest idle timeout accepted: one year
pub const MAX_SESSION_IDLE_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tier used when a caller does not name one
    pub default_tier: String,

    /// Recent turns included in generative prompts
    pub history_window: usize,

    pub session_idle_minutes: u64,

    /// PAM pattern (IUPAC) for guide scans
    pub guide_pam: String,

    /// Host used for codon optimization when the query names none
    pub default_organism: Organism,

    pub backoff: BackoffPolicy,

    pub providers: Vec<ProviderDescriptor>,

    pub tiers: Vec<TierLimits>,

    /// Callers whose exhausted quota is reset instead of denied
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quota_exempt_callers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_tier: "free".to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
            session_idle_minutes: DEFAULT_IDLE_TIMEOUT_MINUTES as u64,
            guide_pam: DEFAULT_PAM.to_string(),
            default_organism: Organism::EscherichiaColi,
            backoff: BackoffPolicy::default(),
            providers: vec![
                ProviderDescriptor::new("openrouter", 1)
                    .with_max_retries(2)
                    .with_timeout(Duration::from_secs(30)),
                ProviderDescriptor::new("openai", 2)
                    .with_max_retries(2)
                    .with_timeout(Duration::from_secs(30)),
                ProviderDescriptor::new("ollama", 3)
                    .with_max_retries(1)
                    .with_timeout(Duration::from_secs(60)),
            ],
            tiers: vec![TierLimits::free(), TierLimits::pro(), TierLimits::enterprise()],
            quota_exempt_callers: Vec::new(),
        }
    }
}

impl Config {
    pub fn tier(&self, name: &str) -> Result<&TierLimits> {
        self.tiers
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| BioMindError::unknown_tier(name))
    }

    pub fn provider(&self, id: &ProviderId) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| &p.id == id)
    }

    /// Idle timeout as a chrono duration, clamped to `MAX_SESSION_IDLE_MINUTES`.
    pub fn session_idle_timeout(&self) -> chrono::Duration {
        let minutes = self.session_idle_minutes.min(MAX_SESSION_IDLE_MINUTES);
        i64::try_from(minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or(chrono::Duration::minutes(MAX_SESSION_IDLE_MINUTES as i64))
    }

    pub fn analyzer(&self) -> SequenceAnalyzer {
        SequenceAnalyzer::new(self.guide_pam.clone()).with_default_organism(self.default_organism)
    }

    pub fn access_gate(&self) -> AccessGate {
        if self.quota_exempt_callers.is_empty() {
            AccessGate::new()
        } else {
            AccessGate::with_bypass(Arc::new(ExemptCallers::new(
                self.quota_exempt_callers.iter().cloned(),
            )))
        }
    }

    /// Snapshot of tier limits and provider descriptors for one request.
    /// `tier` falls back to `default_tier`.
    pub fn request_context(&self, caller_id: &str, tier: Option<&str>) -> Result<RequestContext> {
        let tier = self.tier(tier.unwrap_or(&self.default_tier))?;
        Ok(RequestContext::new(
            caller_id,
            tier.clone(),
            self.providers.clone(),
        ))
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.history_window == 0 {
            return Err(BioMindError::config("history_window must be at least 1"));
        }
        if self.session_idle_minutes == 0 {
            return Err(BioMindError::config("session_idle_minutes must be at least 1"));
        }
        if self.session_idle_minutes > MAX_SESSION_IDLE_MINUTES {
            return Err(BioMindError::config(format!(
                "session_idle_minutes must be at most {MAX_SESSION_IDLE_MINUTES}"
            )));
        }
        if self.guide_pam.trim().is_empty() {
            return Err(BioMindError::config("guide_pam must not be empty"));
        }
        if !self
            .guide_pam
            .chars()
            .all(|c| "ACGTURYSWKMBDHVN".contains(c.to_ascii_uppercase()))
        {
            return Err(BioMindError::config(format!(
                "guide_pam '{}' contains non-IUPAC letters",
                self.guide_pam
            )));
        }
        if self.tiers.is_empty() {
            return Err(BioMindError::config("at least one tier must be configured"));
        }
        self.tier(&self.default_tier)
            .map_err(|_| BioMindError::config(format!("default_tier '{}' is not configured", self.default_tier)))?;

        for (i, provider) in self.providers.iter().enumerate() {
            if self.providers[..i].iter().any(|p| p.id == provider.id) {
                return Err(BioMindError::config(format!(
                    "provider '{}' is configured twice",
                    provider.id
                )));
            }
        }
        for tier in &self.tiers {
            if let Some(unknown) = tier
                .allowed_providers
                .iter()
                .find(|id| self.provider(id).is_none())
            {
                return Err(BioMindError::config(format!(
                    "tier '{}' allows unknown provider '{unknown}'",
                    tier.name
                )));
            }
        }
        Ok(())
    }
}
