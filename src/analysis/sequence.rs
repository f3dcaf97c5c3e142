//! Base-level helpers shared by the analyzers
//!
//! Everything here is a pure function over `&str`. Degenerate input (empty,
//! whitespace only, no nucleotides) yields zero/empty results instead of errors.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

const IUPAC_A: u8 = 1;
const IUPAC_C: u8 = 2;
const IUPAC_G: u8 = 4;
const IUPAC_T: u8 = 8;

static NUCLEOTIDE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[ACGTU]+\b").expect("nucleotide run pattern"));

/// Upper-cases a sequence and drops whitespace and digits (GenBank-style
/// numbering and line breaks).
pub fn normalize(seq: &str) -> String {
    seq.chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_digit())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Case-normalized character histogram, whitespace excluded.
pub fn composition(seq: &str) -> BTreeMap<char, usize> {
    let mut counts = BTreeMap::new();
    for c in seq.chars().filter(|c| !c.is_whitespace()) {
        *counts.entry(c.to_ascii_uppercase()).or_insert(0) += 1;
    }
    counts
}

/// Fraction of G+C among the A/T/C/G/U characters of `seq`.
///
/// Other characters (ambiguity codes, gaps, protein letters) are ignored.
/// Returns 0.0 when the sequence holds no nucleotide at all.
pub fn gc_content(seq: &str) -> f64 {
    let mut gc = 0usize;
    let mut total = 0usize;
    for b in seq.bytes().map(|b| b.to_ascii_uppercase()) {
        match b {
            b'G' | b'C' => {
                gc += 1;
                total += 1;
            }
            b'A' | b'T' | b'U' => total += 1,
            _ => {}
        }
    }
    if total == 0 {
        return 0.0;
    }
    gc as f64 / total as f64
}

/// Number of G and C bases, case-insensitive.
pub fn gc_count(seq: &str) -> usize {
    seq.bytes()
        .filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'C'))
        .count()
}

/// Reverse complement of a DNA sequence. IUPAC ambiguity letters are
/// complemented as well; unknown characters are kept as-is.
pub fn reverse_complement(seq: &str) -> String {
    seq.bytes()
        .rev()
        .map(|b| complement(b.to_ascii_uppercase()) as char)
        .collect()
}

fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' | b'U' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        other => other,
    }
}

fn iupac_mask(letter: u8) -> u8 {
    match letter.to_ascii_uppercase() {
        b'A' => IUPAC_A,
        b'C' => IUPAC_C,
        b'G' => IUPAC_G,
        b'T' | b'U' => IUPAC_T,
        b'W' => IUPAC_A | IUPAC_T,
        b'S' => IUPAC_C | IUPAC_G,
        b'M' => IUPAC_A | IUPAC_C,
        b'K' => IUPAC_G | IUPAC_T,
        b'R' => IUPAC_A | IUPAC_G,
        b'Y' => IUPAC_C | IUPAC_T,
        b'B' => IUPAC_C | IUPAC_G | IUPAC_T,
        b'D' => IUPAC_A | IUPAC_G | IUPAC_T,
        b'H' => IUPAC_A | IUPAC_C | IUPAC_T,
        b'V' => IUPAC_A | IUPAC_C | IUPAC_G,
        b'N' => IUPAC_A | IUPAC_C | IUPAC_G | IUPAC_T,
        _ => 0,
    }
}

/// True when every concrete base in `bases` is allowed by the IUPAC pattern
/// at the same position. Lengths must match.
pub fn matches_iupac(bases: &[u8], pattern: &[u8]) -> bool {
    bases.len() == pattern.len()
        && bases.iter().zip(pattern).all(|(&base, &code)| {
            let base_mask = iupac_mask(base);
            base_mask != 0 && base_mask & iupac_mask(code) == base_mask
        })
}

/// True if `seq` contains a run of at least `run` identical characters.
pub fn has_homopolymer_run(seq: &[u8], run: usize) -> bool {
    if run <= 1 {
        return !seq.is_empty();
    }
    let mut current = 1;
    for pair in seq.windows(2) {
        if pair[0] == pair[1] {
            current += 1;
            if current >= run {
                return true;
            }
        } else {
            current = 1;
        }
    }
    false
}

/// Pulls standalone nucleotide runs of at least `min_len` bases out of free
/// text, upper-cased, in order of appearance.
pub fn extract_sequences(text: &str, min_len: usize) -> Vec<String> {
    NUCLEOTIDE_RUN
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_uppercase())
        .filter(|s| s.len() >= min_len)
        .collect()
}
