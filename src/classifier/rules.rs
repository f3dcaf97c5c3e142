//! Ordered rule lists for each classification axis
//!
//! A rule pairs a predicate with a label. Lists are evaluated top to bottom and
//! the first matching rule wins, so list order is the precedence.

use std::sync::LazyLock;

use regex::Regex;

use crate::classifier::{BioQueryType, Intent, Tone};

/// Queries of at most this many words are classified as concise
pub const CONCISE_MAX_WORDS: usize = 4;

enum Matcher {
    Pattern(Regex),
    Predicate(fn(&str) -> bool),
}

/// A `(predicate, label)` pair
pub struct Rule<L> {
    matcher: Matcher,
    label: L,
}

impl<L: Copy> Rule<L> {
    fn pattern(pattern: &str, label: L) -> Self {
        Self {
            matcher: Matcher::Pattern(Regex::new(pattern).expect("classifier rule pattern")),
            label,
        }
    }

    fn predicate(predicate: fn(&str) -> bool, label: L) -> Self {
        Self {
            matcher: Matcher::Predicate(predicate),
            label,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Pattern(re) => re.is_match(text),
            Matcher::Predicate(predicate) => predicate(text),
        }
    }

    pub fn label(&self) -> L {
        self.label
    }
}

/// Returns the label of the first matching rule, or `default`.
pub fn first_match<L: Copy>(rules: &[Rule<L>], text: &str, default: L) -> L {
    rules
        .iter()
        .find(|rule| rule.matches(text))
        .map(Rule::label)
        .unwrap_or(default)
}

pub static INTENT_RULES: LazyLock<Vec<Rule<Intent>>> = LazyLock::new(|| {
    vec![
        Rule::pattern(
            r"(?i)^\s*(hi|hello|hey|howdy|greetings|good\s+(morning|afternoon|evening))\b",
            Intent::Greeting,
        ),
        Rule::pattern(
            r"(?i)\b(bye|goodbye|farewell|see\s+you|take\s+care|that'?s\s+all|good\s+night)\b",
            Intent::Farewell,
        ),
        Rule::pattern(
            r"(?i)\b(trending|latest|news|breakthroughs?|what'?s\s+new|recent\s+(advances|developments|research|papers|studies))\b",
            Intent::GeneralTrending,
        ),
        Rule::pattern(
            r"(?i)\b(how\s+(does|do|can|to|is|are)|what\s+(is|are|does)|why\s+(does|do|is|are)|explain|difference\s+between|mechanism)\b|\?\s*$",
            Intent::TechnicalQuestion,
        ),
        Rule::pattern(
            r"(?i)\b(help|assist|can\s+you|could\s+you|would\s+you|i\s+need|design|analy[sz]e|optimi[sz]e|check)\b",
            Intent::AssistanceRequest,
        ),
    ]
});

pub static TONE_RULES: LazyLock<Vec<Rule<Tone>>> = LazyLock::new(|| {
    vec![
        Rule::pattern(
            r"(?i)\b(urgent|urgently|asap|immediately|emergency|right\s+now|deadline)\b|!!",
            Tone::Urgent,
        ),
        Rule::pattern(
            r"(?i)\b(please|thank\s+you|thanks|kindly|would\s+you\s+mind|appreciate)\b",
            Tone::Polite,
        ),
        Rule::pattern(
            r"(?i)\b(hey|awesome|cool|great|love|yay)\b|!|:\)",
            Tone::Friendly,
        ),
        Rule::predicate(is_concise, Tone::Concise),
    ]
});

pub static BIO_RULES: LazyLock<Vec<Rule<BioQueryType>>> = LazyLock::new(|| {
    vec![
        Rule::pattern(
            r"(?i)\b(crispr|cas9|cas12a?|cas13|sgrna|grna|guide\s+rnas?|pam\s+sites?|knock-?out|gene\s+editing)\b",
            BioQueryType::Crispr,
        ),
        Rule::pattern(
            r"(?i)\b(pcr|qpcr|rt-pcr|primers?|amplicons?|amplif(y|ication)|melting\s+temp(erature)?|annealing)\b",
            BioQueryType::Pcr,
        ),
        Rule::pattern(
            r"(?i)\b(codons?|codon\s+usage|codon[-\s]optimi[sz](e|ation)|expression\s+optimi[sz]ation)\b",
            BioQueryType::CodonOptimization,
        ),
        Rule::pattern(
            r"(?i)\b(sequences?|gc\s+content|composition|nucleotides?|base\s+pairs?|fasta|genbank|orfs?|open\s+reading\s+frames?|dna|rna)\b",
            BioQueryType::SequenceAnalysis,
        ),
    ]
});

fn is_concise(text: &str) -> bool {
    let words = text.split_whitespace().count();
    words > 0 && words <= CONCISE_MAX_WORDS
}
