//! Query classification
//!
//! `classify` maps raw query text to exactly one label per axis: intent, tone
//! and bioinformatics query type. It is pure and total; text that no rule
//! matches (including empty text) gets the default label of each axis.
//!
//! The three axes are independent. Each one is an ordered rule list in
//! [`rules`], where the first matching rule wins.

pub mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};

use rules::{BIO_RULES, INTENT_RULES, TONE_RULES, first_match};

/// What the user is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Farewell,
    GeneralTrending,
    TechnicalQuestion,
    AssistanceRequest,
    GeneralQuery,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Farewell => "farewell",
            Intent::GeneralTrending => "general_trending",
            Intent::TechnicalQuestion => "technical_question",
            Intent::AssistanceRequest => "assistance_request",
            Intent::GeneralQuery => "general_query",
        }
    }
}

/// How the user is writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Polite,
    Urgent,
    Concise,
    Friendly,
    Professional,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Polite => "polite",
            Tone::Urgent => "urgent",
            Tone::Concise => "concise",
            Tone::Friendly => "friendly",
            Tone::Professional => "professional",
        }
    }

    /// Style instruction for generated answers
    pub fn style_hint(&self) -> &'static str {
        match self {
            Tone::Polite => "Answer courteously and thoroughly.",
            Tone::Urgent => "Lead with the direct answer; keep background to a minimum.",
            Tone::Concise => "Keep the answer short and to the point.",
            Tone::Friendly => "Use a warm, approachable tone.",
            Tone::Professional => "Use a precise, professional tone.",
        }
    }
}

/// Which bioinformatics task, if any, the query is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BioQueryType {
    Crispr,
    Pcr,
    CodonOptimization,
    SequenceAnalysis,
    General,
}

impl BioQueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BioQueryType::Crispr => "crispr",
            BioQueryType::Pcr => "pcr",
            BioQueryType::CodonOptimization => "codon_optimization",
            BioQueryType::SequenceAnalysis => "sequence_analysis",
            BioQueryType::General => "general",
        }
    }

    pub fn is_general(&self) -> bool {
        matches!(self, BioQueryType::General)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        })*
    };
}

display_as_str!(Intent, Tone, BioQueryType);

/// One label per axis. Derived per turn, never persisted beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    pub tone: Tone,
    pub bio_query_type: BioQueryType,
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self {
            intent: Intent::GeneralQuery,
            tone: Tone::Professional,
            bio_query_type: BioQueryType::General,
        }
    }
}

/// Classifies query text. Never fails.
pub fn classify(text: &str) -> ClassificationResult {
    let defaults = ClassificationResult::default();
    if text.trim().is_empty() {
        return defaults;
    }

    let result = ClassificationResult {
        intent: first_match(&INTENT_RULES, text, defaults.intent),
        tone: first_match(&TONE_RULES, text, defaults.tone),
        bio_query_type: first_match(&BIO_RULES, text, defaults.bio_query_type),
    };

    tracing::trace!(
        intent = %result.intent,
        tone = %result.tone,
        bio_query_type = %result.bio_query_type,
        "Query classified"
    );

    result
}
