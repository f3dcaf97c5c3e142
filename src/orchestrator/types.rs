use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{DenyReason, TierLimits};
use crate::analysis::{
    CodonOptimization, GuideCandidate, ParsedFileContext, PcrReport, SequenceType,
};
use crate::classifier::ClassificationResult;
use crate::providers::{ProviderDescriptor, ProviderId, RouterError};
use crate::session::Turn;

/// A user query. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_file: Option<ParsedFileContext>,
    pub requested_at: DateTime<Utc>,
}

impl Query {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            attached_file: None,
            requested_at: Utc::now(),
        }
    }

    pub fn with_file(mut self, file: ParsedFileContext) -> Self {
        self.attached_file = Some(file);
        self
    }
}

/// Who is asking and under which tier. Descriptors are a snapshot taken when
/// the request starts; later config changes do not affect it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub caller_id: String,
    pub session_key: String,
    pub tier: TierLimits,
    pub providers: Vec<ProviderDescriptor>,
}

impl RequestContext {
    /// Context whose session key is the caller id
    pub fn new(caller_id: impl Into<String>, tier: TierLimits, providers: Vec<ProviderDescriptor>) -> Self {
        let caller_id = caller_id.into();
        Self {
            session_key: caller_id.clone(),
            caller_id,
            tier,
            providers,
        }
    }

    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }
}

/// Machine-readable cause attached to every error response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    QuotaExceeded,
    FileTooLarge,
    FeatureUnavailable,
    NoEligibleProvider,
    AllProvidersFailed,
    Cancelled,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::QuotaExceeded => "quota_exceeded",
            ReasonCode::FileTooLarge => "file_too_large",
            ReasonCode::FeatureUnavailable => "feature_unavailable",
            ReasonCode::NoEligibleProvider => "no_eligible_provider",
            ReasonCode::AllProvidersFailed => "all_providers_failed",
            ReasonCode::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<DenyReason> for ReasonCode {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::QuotaExceeded => ReasonCode::QuotaExceeded,
            DenyReason::FileTooLarge => ReasonCode::FileTooLarge,
            DenyReason::FeatureUnavailable => ReasonCode::FeatureUnavailable,
        }
    }
}

impl From<&RouterError> for ReasonCode {
    fn from(err: &RouterError) -> Self {
        match err {
            RouterError::NoEligibleProvider => ReasonCode::NoEligibleProvider,
            RouterError::AllProvidersFailed { .. } => ReasonCode::AllProvidersFailed,
            RouterError::Cancelled => ReasonCode::Cancelled,
        }
    }
}

/// Where the answer came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseSource {
    /// Computed locally by the sequence analyzer
    Analysis,
    /// Generated by a backend
    Provider { id: ProviderId, attempts: u32 },
    /// Stopped by the access gate
    AccessDenied,
    /// No backend produced an answer
    RoutingFailed,
    Cancelled,
}

/// Structured result of a deterministic analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "analysis", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Guides {
        pam: String,
        candidates: Vec<GuideCandidate>,
    },
    Pcr {
        forward: String,
        reverse: String,
        report: PcrReport,
    },
    Codons {
        organism: String,
        result: CodonOptimization,
    },
    Sequence {
        sequence_type: SequenceType,
        length: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        gc_content: Option<f64>,
        composition: BTreeMap<char, usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub session_id: String,
    /// Assistant or error turn answering the query
    pub turn: Turn,
    pub classification: ClassificationResult,
    pub source: ResponseSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCode>,
    /// Tier limits, present on access denials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<TierLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisOutcome>,
}

impl QueryResponse {
    pub fn is_error(&self) -> bool {
        self.turn.is_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_match_deny_reasons() {
        for reason in [
            DenyReason::QuotaExceeded,
            DenyReason::FileTooLarge,
            DenyReason::FeatureUnavailable,
        ] {
            assert_eq!(ReasonCode::from(reason).as_str(), reason.as_str());
        }
        assert_eq!(
            ReasonCode::from(&RouterError::NoEligibleProvider).as_str(),
            RouterError::NoEligibleProvider.reason_code()
        );
    }

    #[test]
    fn test_request_context_defaults_session_key() {
        let ctx = RequestContext::new("caller-9", TierLimits::free(), vec![]);
        assert_eq!(ctx.session_key, "caller-9");
        let ctx = ctx.with_session_key("chat-1");
        assert_eq!(ctx.session_key, "chat-1");
        assert_eq!(ctx.caller_id, "caller-9");
    }

    #[test]
    fn test_source_serialization() {
        let json = serde_json::to_value(ResponseSource::Provider {
            id: ProviderId::new("openai"),
            attempts: 2,
        })
        .unwrap();
        assert_eq!(json["kind"], "provider");
        assert_eq!(json["id"], "openai");
    }
}
