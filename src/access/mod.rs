//! Tier-based access control
//!
//! [`AccessGate::check`] is a pure decision over the caller's tier limits, the
//! usage counted so far and the requested operation. Usage itself lives behind
//! the [`UsageLedger`] trait so the gate never touches storage.

pub mod tiers;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub use tiers::{FeatureFlag, QueryQuota, TierLimits};

/// What the caller is asking to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A query, optionally gated by an analysis feature
    Query { feature: Option<FeatureFlag> },
    /// A query with an attached file of `size_bytes`
    FileUpload {
        size_bytes: u64,
        feature: Option<FeatureFlag>,
    },
}

impl Operation {
    pub fn query() -> Self {
        Operation::Query { feature: None }
    }

    pub fn feature(&self) -> Option<FeatureFlag> {
        match self {
            Operation::Query { feature } | Operation::FileUpload { feature, .. } => *feature,
        }
    }
}

/// Machine-readable denial reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    QuotaExceeded,
    FileTooLarge,
    FeatureUnavailable,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::QuotaExceeded => "quota_exceeded",
            DenyReason::FileTooLarge => "file_too_large",
            DenyReason::FeatureUnavailable => "feature_unavailable",
        }
    }

    /// Stable, user-safe explanation
    pub fn user_message(&self) -> &'static str {
        match self {
            DenyReason::QuotaExceeded => {
                "You have reached the query limit for your plan. Upgrade or wait for the next period."
            }
            DenyReason::FileTooLarge => "The attached file exceeds the size limit for your plan.",
            DenyReason::FeatureUnavailable => "This analysis is not included in your plan.",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    Allow,
    /// Quota was exhausted but the caller is exempt: usage must be reset
    /// before the request proceeds.
    ResetAndAllow,
    Deny {
        reason: DenyReason,
        limits: TierLimits,
    },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AccessDecision::Deny { .. })
    }
}

/// Decides whether a caller whose quota is exhausted gets a reset instead of
/// a denial.
pub trait QuotaBypass: Send + Sync {
    fn should_reset(&self, caller_id: &str, limits: &TierLimits) -> bool;
}

/// Bypass for an explicit, configured set of caller ids
#[derive(Debug, Clone, Default)]
pub struct ExemptCallers {
    callers: BTreeSet<String>,
}

impl ExemptCallers {
    pub fn new<I, S>(callers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            callers: callers.into_iter().map(Into::into).collect(),
        }
    }
}

impl QuotaBypass for ExemptCallers {
    fn should_reset(&self, caller_id: &str, _limits: &TierLimits) -> bool {
        self.callers.contains(caller_id)
    }
}

#[derive(Clone, Default)]
pub struct AccessGate {
    bypass: Option<Arc<dyn QuotaBypass>>,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bypass(bypass: Arc<dyn QuotaBypass>) -> Self {
        Self {
            bypass: Some(bypass),
        }
    }

    /// Evaluates, in order: file size, feature, quota.
    pub fn check(
        &self,
        caller_id: &str,
        limits: &TierLimits,
        current_usage: u32,
        op: &Operation,
    ) -> AccessDecision {
        let deny = |reason| AccessDecision::Deny {
            reason,
            limits: limits.clone(),
        };

        if let Operation::FileUpload { size_bytes, .. } = op {
            if *size_bytes > limits.max_file_size_bytes() {
                return deny(DenyReason::FileTooLarge);
            }
            if !limits.allows_feature(FeatureFlag::FileUpload) {
                return deny(DenyReason::FeatureUnavailable);
            }
        }

        if let Some(feature) = op.feature() {
            if !limits.allows_feature(feature) {
                return deny(DenyReason::FeatureUnavailable);
            }
        }

        if limits.max_queries_per_period.is_exhausted(current_usage) {
            let exempt = self
                .bypass
                .as_ref()
                .is_some_and(|b| b.should_reset(caller_id, limits));
            if exempt {
                tracing::info!(caller_id, tier = %limits.name, "Quota exhausted, resetting for exempt caller");
                return AccessDecision::ResetAndAllow;
            }
            return deny(DenyReason::QuotaExceeded);
        }

        AccessDecision::Allow
    }
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("bypass", &self.bypass.is_some())
            .finish()
    }
}

/// Per-caller usage counter for the current period
#[async_trait]
pub trait UsageLedger: Send + Sync {
    async fn current_usage(&self, caller_id: &str) -> u32;
    async fn consume(&self, caller_id: &str);
    async fn reset(&self, caller_id: &str);
}

#[derive(Debug, Default)]
pub struct InMemoryUsageLedger {
    counts: Mutex<HashMap<String, u32>>,
}

impl InMemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn current_usage(&self, caller_id: &str) -> u32 {
        self.counts.lock().await.get(caller_id).copied().unwrap_or(0)
    }

    async fn consume(&self, caller_id: &str) {
        let mut counts = self.counts.lock().await;
        let count = counts.entry(caller_id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
    }

    async fn reset(&self, caller_id: &str) {
        self.counts.lock().await.remove(caller_id);
    }
}
