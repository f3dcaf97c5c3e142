//! Typed context produced from an uploaded file
//!
//! The orchestrator only ever sees `ParsedFileContext`; raw bytes stay with the
//! file-analysis collaborator. `from_text` covers the plain-text formats
//! (FASTA, raw sequence, tabular data) that need no binary extraction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::sequence::{composition, gc_content, normalize};

/// Fraction of sequence characters that must belong to an alphabet for the
/// file to be typed as that alphabet
const ALPHABET_THRESHOLD: f64 = 0.9;

const PROTEIN_LETTERS: &str = "ACDEFGHIKLMNPQRSTVWY*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    Dna,
    Rna,
    Protein,
    Document,
    Data,
    Unknown,
}

impl SequenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceType::Dna => "dna",
            SequenceType::Rna => "rna",
            SequenceType::Protein => "protein",
            SequenceType::Document => "document",
            SequenceType::Data => "data",
            SequenceType::Unknown => "unknown",
        }
    }

    /// DNA or RNA
    pub fn is_nucleotide(&self) -> bool {
        matches!(self, SequenceType::Dna | SequenceType::Rna)
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only summary of an attached file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFileContext {
    pub sequence_type: SequenceType,
    pub sequence: String,
    pub composition: BTreeMap<char, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_content: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Size of the uploaded file, used for tier file-size limits
    pub size_bytes: u64,
}

impl ParsedFileContext {
    /// Builds a context from an already extracted sequence.
    pub fn from_sequence(sequence_type: SequenceType, sequence: impl Into<String>) -> Self {
        let sequence = sequence.into();
        let gc = sequence_type
            .is_nucleotide()
            .then(|| gc_content(&sequence));
        Self {
            sequence_type,
            composition: composition(&sequence),
            gc_content: gc,
            size_bytes: sequence.len() as u64,
            file_name: None,
            sequence,
        }
    }

    /// Parses FASTA or raw sequence text. Header (`>`) and comment (`;`)
    /// lines are dropped; only the first FASTA record is kept. Text that is
    /// not a sequence becomes `Data` (tab/comma separated) or `Document`.
    pub fn from_text(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut records = 0;
        for line in text.lines().map(str::trim) {
            if line.starts_with('>') {
                records += 1;
                if records > 1 {
                    break;
                }
                continue;
            }
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            lines.push(line);
        }

        let candidate = normalize(&lines.concat());
        let sequence_type = detect_sequence_type(&candidate, text);
        let sequence = match sequence_type {
            SequenceType::Document | SequenceType::Data | SequenceType::Unknown => String::new(),
            _ => candidate,
        };

        let mut ctx = Self::from_sequence(sequence_type, sequence);
        ctx.size_bytes = text.len() as u64;
        ctx
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_size_bytes(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    /// Whether the attached file carries a sequence the analyzers can use
    pub fn has_sequence(&self) -> bool {
        !self.sequence.is_empty()
    }

    /// One-paragraph description used in generated prompts
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Attached {} file{}: {} residues",
            self.sequence_type,
            self.file_name
                .as_deref()
                .map(|n| format!(" '{n}'"))
                .unwrap_or_default(),
            self.sequence.len()
        );
        if let Some(gc) = self.gc_content {
            summary.push_str(&format!(", GC content {:.1}%", gc * 100.0));
        }
        summary
    }
}

fn detect_sequence_type(candidate: &str, raw: &str) -> SequenceType {
    if candidate.is_empty() {
        return if raw.trim().is_empty() {
            SequenceType::Unknown
        } else {
            SequenceType::Document
        };
    }

    let total = candidate.chars().count() as f64;
    let share = |pred: &dyn Fn(char) -> bool| candidate.chars().filter(|&c| pred(c)).count() as f64 / total;

    let nucleotide = share(&|c| "ACGTUN-".contains(c));
    if nucleotide >= ALPHABET_THRESHOLD {
        let has_u = candidate.contains('U');
        let has_t = candidate.contains('T');
        return if has_u && !has_t {
            SequenceType::Rna
        } else {
            SequenceType::Dna
        };
    }
    if share(&|c| PROTEIN_LETTERS.contains(c)) >= ALPHABET_THRESHOLD {
        return SequenceType::Protein;
    }
    if raw.lines().any(|l| l.contains('\t') || l.matches(',').count() >= 2) {
        return SequenceType::Data;
    }
    SequenceType::Document
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fasta_dna() {
        let ctx = ParsedFileContext::from_text(">seq1 test\nATGCGC\nATAT\n");
        assert_eq!(ctx.sequence_type, SequenceType::Dna);
        assert_eq!(ctx.sequence, "ATGCGCATAT");
        assert_eq!(ctx.gc_content, Some(0.4));
        assert_eq!(ctx.composition.get(&'A'), Some(&3));
    }

    #[test]
    fn test_only_first_record_kept() {
        let ctx = ParsedFileContext::from_text(">a\nAAAA\n>b\nCCCC\n");
        assert_eq!(ctx.sequence, "AAAA");
    }

    #[test]
    fn test_rna_detection() {
        let ctx = ParsedFileContext::from_text("AUGGCUUAA");
        assert_eq!(ctx.sequence_type, SequenceType::Rna);
    }

    #[test]
    fn test_protein_detection() {
        let ctx = ParsedFileContext::from_text(">sp|P04637\nMEEPQSDPSVEPPLSQETFSDLWKLLPEN");
        assert_eq!(ctx.sequence_type, SequenceType::Protein);
        assert_eq!(ctx.gc_content, None);
    }

    #[test]
    fn test_tabular_data() {
        let ctx = ParsedFileContext::from_text("gene,expression,pvalue\nTP53,2.3,0.01\n");
        assert_eq!(ctx.sequence_type, SequenceType::Data);
        assert!(!ctx.has_sequence());
    }

    #[test]
    fn test_plain_document() {
        let ctx = ParsedFileContext::from_text("Meeting notes: discuss the cloning plan.");
        assert_eq!(ctx.sequence_type, SequenceType::Document);
        assert!(ctx.sequence.is_empty());
    }

    #[test]
    fn test_empty_file() {
        let ctx = ParsedFileContext::from_text("");
        assert_eq!(ctx.sequence_type, SequenceType::Unknown);
        assert_eq!(ctx.size_bytes, 0);
    }

    #[test]
    fn test_summary_mentions_gc() {
        let ctx = ParsedFileContext::from_sequence(SequenceType::Dna, "GGCC").with_file_name("x.fa");
        let summary = ctx.summary();
        assert!(summary.contains("dna file 'x.fa'"));
        assert!(summary.contains("100.0%"));
    }
}
