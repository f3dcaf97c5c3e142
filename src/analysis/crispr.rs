//! Guide-RNA candidate scanning
//!
//! Slides a fixed 20-nt protospacer window along the forward strand and keeps
//! every window immediately followed by the PAM. Candidates are scored with a
//! simple additive heuristic and the best five are returned.

use serde::{Deserialize, Serialize};

use crate::analysis::sequence::{gc_content, has_homopolymer_run, matches_iupac, normalize};

/// Protospacer length in nucleotides
pub const GUIDE_LENGTH: usize = 20;

/// PAM used when the caller does not configure one (SpCas9)
pub const DEFAULT_PAM: &str = "NGG";

/// Maximum number of candidates returned by a scan
pub const MAX_GUIDES: usize = 5;

const BASE_SCORE: u32 = 50;
const GC_BONUS: u32 = 20;
const NO_HOMOPOLYMER_BONUS: u32 = 20;
const HOMOPOLYMER_RUN: usize = 4;
const GC_WINDOW: (f64, f64) = (0.4, 0.6);

/// A scored guide-RNA candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideCandidate {
    /// 0-based offset of the protospacer in the normalized sequence
    pub start: usize,
    /// The 20-nt protospacer
    pub sequence: String,
    /// The bases that matched the PAM pattern
    pub pam: String,
    pub gc_content: f64,
    pub score: u32,
}

/// Scans `seq` for guide candidates followed by `pam`.
///
/// `pam` letters are IUPAC codes, so `NGG` accepts `AGG`, `CGG`, `GGG` and
/// `TGG`. Windows containing anything other than A/C/G/T are skipped. Results
/// are sorted by descending score, ties broken by ascending start offset, and
/// truncated to [`MAX_GUIDES`].
pub fn scan_guide_candidates(seq: &str, pam: &str) -> Vec<GuideCandidate> {
    let seq = normalize(seq).replace('U', "T");
    let pam = normalize(pam);
    let bytes = seq.as_bytes();
    let pam_bytes = pam.as_bytes();

    if pam_bytes.is_empty() || bytes.len() < GUIDE_LENGTH + pam_bytes.len() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for start in 0..=(bytes.len() - GUIDE_LENGTH - pam_bytes.len()) {
        let protospacer = &bytes[start..start + GUIDE_LENGTH];
        let site = &bytes[start + GUIDE_LENGTH..start + GUIDE_LENGTH + pam_bytes.len()];

        if !protospacer
            .iter()
            .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
        {
            continue;
        }
        if !matches_iupac(site, pam_bytes) {
            continue;
        }

        // Both slices are ASCII, checked above
        let sequence = String::from_utf8_lossy(protospacer).into_owned();
        let gc = gc_content(&sequence);
        candidates.push(GuideCandidate {
            start,
            score: score_guide(protospacer, gc),
            pam: String::from_utf8_lossy(site).into_owned(),
            gc_content: gc,
            sequence,
        });
    }

    candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.start.cmp(&b.start)));
    candidates.truncate(MAX_GUIDES);
    candidates
}

fn score_guide(protospacer: &[u8], gc: f64) -> u32 {
    let mut score = BASE_SCORE;
    if (GC_WINDOW.0..=GC_WINDOW.1).contains(&gc) {
        score += GC_BONUS;
    }
    if !has_homopolymer_run(protospacer, HOMOPOLYMER_RUN) {
        score += NO_HOMOPOLYMER_BONUS;
    }
    score
}
