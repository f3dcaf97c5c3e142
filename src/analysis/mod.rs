//! Deterministic sequence analysis
//!
//! Everything in this module is a pure, synchronous function: no I/O, no
//! locks, no randomness. Identical input always gives identical output, which
//! keeps test fixtures reproducible. Degenerate input (empty strings, no
//! nucleotides) returns zero/empty results instead of an error.
//!
//! - [`sequence`]: composition, GC content, reverse complement, IUPAC matching
//! - [`crispr`]: guide-RNA candidate scan
//! - [`pcr`]: primer melting temperature and PCR feasibility
//! - [`codon`]: codon-table substitution
//! - [`file_context`]: the typed view of an attached file

pub mod codon;
pub mod crispr;
pub mod file_context;
pub mod pcr;
pub mod sequence;

use std::collections::BTreeMap;

pub use codon::{CodonOptimization, CodonTable, Organism, optimize_codons, translate_codon};
pub use crispr::{DEFAULT_PAM, GUIDE_LENGTH, GuideCandidate, MAX_GUIDES, scan_guide_candidates};
pub use file_context::{ParsedFileContext, SequenceType};
pub use pcr::{PcrReport, PrimerTemperatures, melting_temperature, pcr_feasibility};
pub use sequence::{composition, extract_sequences, gc_content, reverse_complement};

/// Analyzer settings shared by every call: the PAM for guide scans and the
/// host used when a codon request names none.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceAnalyzer {
    pam: String,
    default_organism: Organism,
}

impl SequenceAnalyzer {
    pub fn new(pam: impl Into<String>) -> Self {
        Self {
            pam: pam.into(),
            default_organism: Organism::EscherichiaColi,
        }
    }

    pub fn with_default_organism(mut self, organism: Organism) -> Self {
        self.default_organism = organism;
        self
    }

    pub fn pam(&self) -> &str {
        &self.pam
    }

    pub fn default_organism(&self) -> Organism {
        self.default_organism
    }

    pub fn composition(&self, seq: &str) -> BTreeMap<char, usize> {
        composition(seq)
    }

    pub fn gc_content(&self, seq: &str) -> f64 {
        gc_content(seq)
    }

    /// Guide scan with the configured PAM
    pub fn scan_guide_candidates(&self, seq: &str) -> Vec<GuideCandidate> {
        scan_guide_candidates(seq, &self.pam)
    }

    pub fn pcr_feasibility(&self, forward: &str, reverse: &str, template: &str) -> PcrReport {
        pcr_feasibility(forward, reverse, template)
    }

    /// Codon optimization for `organism`, or the default host when `None`
    pub fn optimize_codons(&self, seq: &str, organism: Option<Organism>) -> CodonOptimization {
        let table = CodonTable::for_organism(organism.unwrap_or(self.default_organism));
        optimize_codons(seq, &table)
    }
}

impl Default for SequenceAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_PAM)
    }
}
