//! Conversational memory extraction
//!
//! Runs on every appended turn. Pure pattern matching over the turn text, so
//! it cannot fail; text with no matches simply adds nothing.

use std::sync::LazyLock;

use regex::Regex;

/// Domain terms tracked as conversation topics
pub const DOMAIN_TOPICS: &[&str] = &[
    "crispr",
    "pcr",
    "primer",
    "codon",
    "gene expression",
    "gene editing",
    "sequencing",
    "genome",
    "protein",
    "plasmid",
    "cloning",
    "mutation",
    "transcription",
    "translation",
    "enzyme",
    "antibody",
    "cell culture",
    "bioinformatics",
    "dna",
    "rna",
];

/// All-caps words that look like gene symbols but are not
const SYMBOL_STOPLIST: &[&str] = &[
    "DNA", "RNA", "MRNA", "TRNA", "PCR", "QPCR", "CRISPR", "PAM", "GC", "ATP", "USA", "FAQ", "API",
    "PDF", "CSV", "FASTA", "ORF", "NGS", "THE", "AND", "FOR", "NOT", "YOU", "ASAP", "HELP", "PLEASE",
];

/// Capitalized words that start sentences rather than genera
const GENUS_STOPLIST: &[&str] = &[
    "The", "This", "That", "These", "What", "Which", "How", "Why", "When", "Where", "Can",
    "Could", "Would", "Please", "Tell", "Design", "Check", "Explain", "Show", "Is", "Are", "Do",
    "Does", "I", "We", "My", "Our", "In", "For", "With", "From", "Give",
];

static TOPIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = DOMAIN_TOPICS
        .iter()
        .map(|t| regex::escape(t).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("topic pattern")
});

static ACCESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]{1,2}_?\d{5,9}(?:\.\d+)?\b").expect("accession pattern")
});

static GENE_SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9]{2,9}\b").expect("gene symbol pattern"));

static BINOMIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b([A-Z][a-z]+\s|[A-Z]\.\s?)([a-z]{3,}(?:us|um|a|ae|is|i|ii|ensis|ans|ens|oides|er|o))\b",
    )
    .expect("species pattern")
});

/// Canonical (lower-case, single-spaced) domain topics mentioned in `text`
pub fn extract_topics(text: &str) -> Vec<String> {
    TOPIC_RE
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .collect()
}

/// Accession ids, gene symbols and species names mentioned in `text`
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut entities: Vec<String> = ACCESSION_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    for m in GENE_SYMBOL_RE.find_iter(text) {
        let symbol = m.as_str();
        if is_gene_symbol(symbol) {
            entities.push(symbol.to_string());
        }
    }

    for caps in BINOMIAL_RE.captures_iter(text) {
        let genus = caps[1].trim_end();
        if GENUS_STOPLIST.contains(&genus) {
            continue;
        }
        entities.push(format!("{genus} {}", &caps[2]));
    }

    entities
}

fn is_gene_symbol(word: &str) -> bool {
    if SYMBOL_STOPLIST.contains(&word) {
        return false;
    }
    // Bare nucleotide runs are sequences, not symbols
    if word.bytes().all(|b| b"ACGTUN".contains(&b)) {
        return false;
    }
    !ACCESSION_RE.is_match(word)
}
