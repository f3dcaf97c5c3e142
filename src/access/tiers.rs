use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::providers::ProviderId;

/// Capabilities a tier can enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    CrisprDesign,
    PcrAnalysis,
    CodonOptimization,
    SequenceAnalysis,
    FileUpload,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 5] = [
        FeatureFlag::CrisprDesign,
        FeatureFlag::PcrAnalysis,
        FeatureFlag::CodonOptimization,
        FeatureFlag::SequenceAnalysis,
        FeatureFlag::FileUpload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlag::CrisprDesign => "crispr_design",
            FeatureFlag::PcrAnalysis => "pcr_analysis",
            FeatureFlag::CodonOptimization => "codon_optimization",
            FeatureFlag::SequenceAnalysis => "sequence_analysis",
            FeatureFlag::FileUpload => "file_upload",
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-period query allowance.
///
/// Serialized as an integer where `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum QueryQuota {
    Unlimited,
    Limited(u32),
}

impl QueryQuota {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, QueryQuota::Unlimited)
    }

    /// Whether `usage` has used up the allowance
    pub fn is_exhausted(&self, usage: u32) -> bool {
        match self {
            QueryQuota::Unlimited => false,
            QueryQuota::Limited(max) => usage >= *max,
        }
    }
}

impl TryFrom<i64> for QueryQuota {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(QueryQuota::Unlimited),
            v if v >= 0 => u32::try_from(v)
                .map(QueryQuota::Limited)
                .map_err(|_| format!("query quota {v} is too large")),
            v => Err(format!(
                "query quota must be -1 (unlimited) or non-negative, got {v}"
            )),
        }
    }
}

impl From<QueryQuota> for i64 {
    fn from(quota: QueryQuota) -> Self {
        match quota {
            QueryQuota::Unlimited => -1,
            QueryQuota::Limited(max) => i64::from(max),
        }
    }
}

impl fmt::Display for QueryQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryQuota::Unlimited => write!(f, "unlimited"),
            QueryQuota::Limited(max) => write!(f, "{max}"),
        }
    }
}

/// What a subscription tier may do. Read-only during a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierLimits {
    pub name: String,
    pub max_queries_per_period: QueryQuota,
    pub max_file_size_mb: u64,
    /// Providers this tier may use, in the tier's preferred order
    pub allowed_providers: Vec<ProviderId>,
    pub allowed_features: BTreeSet<FeatureFlag>,
}

impl TierLimits {
    pub fn allows_feature(&self, feature: FeatureFlag) -> bool {
        self.allowed_features.contains(&feature)
    }

    pub fn allows_provider(&self, provider: &ProviderId) -> bool {
        self.allowed_providers.contains(provider)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn free() -> Self {
        Self {
            name: "free".to_string(),
            max_queries_per_period: QueryQuota::Limited(10),
            max_file_size_mb: 5,
            allowed_providers: vec![ProviderId::new("openrouter")],
            allowed_features: [FeatureFlag::SequenceAnalysis, FeatureFlag::FileUpload]
                .into_iter()
                .collect(),
        }
    }

    pub fn pro() -> Self {
        Self {
            name: "pro".to_string(),
            max_queries_per_period: QueryQuota::Limited(500),
            max_file_size_mb: 50,
            allowed_providers: vec![ProviderId::new("openrouter"), ProviderId::new("openai")],
            allowed_features: FeatureFlag::ALL.into_iter().collect(),
        }
    }

    pub fn enterprise() -> Self {
        Self {
            name: "enterprise".to_string(),
            max_queries_per_period: QueryQuota::Unlimited,
            max_file_size_mb: 500,
            allowed_providers: vec![
                ProviderId::new("openai"),
                ProviderId::new("openrouter"),
                ProviderId::new("ollama"),
            ],
            allowed_features: FeatureFlag::ALL.into_iter().collect(),
        }
    }
}
