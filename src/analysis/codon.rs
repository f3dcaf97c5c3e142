//! Codon-table substitution for expression optimization
//!
//! Each organism table maps an amino acid (one-letter code, `*` for stop) to
//! its single most-preferred codon. Optimization walks the coding sequence in
//! non-overlapping triplets and swaps every recognised codon for the preferred
//! synonym.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};


/// Standard genetic code, codons enumerated in TCAG order per position
const STANDARD_CODE: &[u8; 64] = b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";
const TCAG: &[u8; 4] = b"TCAG";

const ECOLI_PREFERRED: &[(char, &str)] = &[
    ('A', "GCG"), ('R', "CGT"), ('N', "AAC"), ('D', "GAT"), ('C', "TGC"),
    ('Q', "CAG"), ('E', "GAA"), ('G', "GGC"), ('H', "CAT"), ('I', "ATT"),
    ('L', "CTG"), ('K', "AAA"), ('M', "ATG"), ('F', "TTT"), ('P', "CCG"),
    ('S', "AGC"), ('T', "ACC"), ('W', "TGG"), ('Y', "TAT"), ('V', "GTG"),
    ('*', "TAA"),
];

const HUMAN_PREFERRED: &[(char, &str)] = &[
    ('A', "GCC"), ('R', "CGG"), ('N', "AAC"), ('D', "GAC"), ('C', "TGC"),
    ('Q', "CAG"), ('E', "GAG"), ('G', "GGC"), ('H', "CAC"), ('I', "ATC"),
    ('L', "CTG"), ('K', "AAG"), ('M', "ATG"), ('F', "TTC"), ('P', "CCC"),
    ('S', "AGC"), ('T', "ACC"), ('W', "TGG"), ('Y', "TAC"), ('V', "GTG"),
    ('*', "TGA"),
];

const YEAST_PREFERRED: &[(char, &str)] = &[
    ('A', "GCT"), ('R', "AGA"), ('N', "AAT"), ('D', "GAT"), ('C', "TGT"),
    ('Q', "CAA"), ('E', "GAA"), ('G', "GGT"), ('H', "CAT"), ('I', "ATT"),
    ('L', "TTG"), ('K', "AAA"), ('M', "ATG"), ('F', "TTT"), ('P', "CCA"),
    ('S', "TCT"), ('T', "ACT"), ('W', "TGG"), ('Y', "TAT"), ('V', "GTT"),
    ('*', "TAA"),
];

/// Expression hosts with a built-in codon table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Organism {
    EscherichiaColi,
    HomoSapiens,
    SaccharomycesCerevisiae,
}

impl Organism {
    pub const ALL: [Organism; 3] = [
        Organism::EscherichiaColi,
        Organism::HomoSapiens,
        Organism::SaccharomycesCerevisiae,
    ];

    /// Scientific name
    pub fn as_str(&self) -> &'static str {
        match self {
            Organism::EscherichiaColi => "Escherichia coli",
            Organism::HomoSapiens => "Homo sapiens",
            Organism::SaccharomycesCerevisiae => "Saccharomyces cerevisiae",
        }
    }

    /// Finds the first host mentioned in free text ("optimize for yeast",
    /// "E. coli expression", "human cells").
    pub fn detect(text: &str) -> Option<Organism> {
        let lower = text.to_lowercase();
        let mentions = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));
        if mentions(&["e. coli", "e.coli", "ecoli", "escherichia", "bacteria", "bacterial"]) {
            Some(Organism::EscherichiaColi)
        } else if mentions(&["human", "homo sapiens", "mammalian", "hek293", "cho cells"]) {
            Some(Organism::HomoSapiens)
        } else if mentions(&["yeast", "cerevisiae", "saccharomyces"]) {
            Some(Organism::SaccharomycesCerevisiae)
        } else {
            None
        }
    }

    /// Parses a CLI-style short name
    pub fn from_name(name: &str) -> Option<Organism> {
        match name.to_lowercase().replace(['.', '_', '-', ' '], "").as_str() {
            "ecoli" | "escherichiacoli" => Some(Organism::EscherichiaColi),
            "human" | "homosapiens" | "hsapiens" => Some(Organism::HomoSapiens),
            "yeast" | "scerevisiae" | "saccharomycescerevisiae" => {
                Some(Organism::SaccharomycesCerevisiae)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-organism mapping from amino acid to its preferred codon (DNA alphabet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodonTable {
    pub organism: String,
    pub preferred: BTreeMap<char, String>,
}

impl CodonTable {
    pub fn new(organism: impl Into<String>, preferred: BTreeMap<char, String>) -> Self {
        Self {
            organism: organism.into(),
            preferred,
        }
    }

    /// Built-in table for a host organism
    pub fn for_organism(organism: Organism) -> Self {
        let entries = match organism {
            Organism::EscherichiaColi => ECOLI_PREFERRED,
            Organism::HomoSapiens => HUMAN_PREFERRED,
            Organism::SaccharomycesCerevisiae => YEAST_PREFERRED,
        };
        Self::new(
            organism.as_str(),
            entries
                .iter()
                .map(|(aa, codon)| (*aa, (*codon).to_string()))
                .collect(),
        )
    }

    pub fn preferred_codon(&self, amino_acid: char) -> Option<&str> {
        self.preferred.get(&amino_acid).map(String::as_str)
    }
}

/// Outcome of a codon optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodonOptimization {
    pub optimized_sequence: String,
    /// Number of codons that were replaced by a different synonym
    pub substitution_count: usize,
    /// Histogram of the recognised codons in the optimized sequence
    pub codon_usage: BTreeMap<String, usize>,
}

/// Translates a DNA or RNA codon with the standard genetic code.
pub fn translate_codon(codon: &str) -> Option<char> {
    let bytes = codon.as_bytes();
    if bytes.len() != 3 {
        return None;
    }
    let mut index = 0usize;
    for &b in bytes {
        let base = match b.to_ascii_uppercase() {
            b'U' => b'T',
            other => other,
        };
        let pos = TCAG.iter().position(|&c| c == base)?;
        index = index * 4 + pos;
    }
    Some(STANDARD_CODE[index] as char)
}

/// Replaces each recognised codon with the table's preferred synonym.
///
/// Whitespace and digits are layout and are dropped. Triplets that do not
/// translate (ambiguity codes, gaps, non-ASCII text) and a trailing partial
/// codon of one or two bases are copied through exactly as written. RNA input
/// stays RNA.
pub fn optimize_codons(sequence: &str, table: &CodonTable) -> CodonOptimization {
    let residues: Vec<char> = sequence
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_digit())
        .collect();
    let has = |base: char| residues.iter().any(|c| c.eq_ignore_ascii_case(&base));
    let is_rna = has('U') && !has('T');

    let mut optimized = String::with_capacity(sequence.len());
    let mut substitution_count = 0;
    let mut codon_usage = BTreeMap::new();

    let full = residues.len() - residues.len() % 3;

    for chunk in residues[..full].chunks(3) {
        let codon: String = chunk.iter().map(|c| c.to_ascii_uppercase()).collect();
        let dna_codon = codon.replace('U', "T");

        let replacement = translate_codon(&dna_codon)
            .and_then(|aa| table.preferred_codon(aa))
            .map(|preferred| {
                if is_rna {
                    preferred.replace('T', "U")
                } else {
                    preferred.to_string()
                }
            });

        match replacement {
            Some(new_codon) => {
                if new_codon != codon {
                    substitution_count += 1;
                }
                *codon_usage.entry(new_codon.clone()).or_insert(0) += 1;
                optimized.push_str(&new_codon);
            }
            None => optimized.extend(chunk),
        }
    }
    optimized.extend(&residues[full..]);

    CodonOptimization {
        optimized_sequence: optimized,
        substitution_count,
        codon_usage,
    }
}
