//! Text rendering of analysis results and user-safe failure messages

use crate::analysis::{CodonOptimization, GuideCandidate, ParsedFileContext, PcrReport};
use crate::providers::RouterError;

pub fn format_guides(pam: &str, guides: &[GuideCandidate]) -> String {
    if guides.is_empty() {
        return format!("No guide candidates found: no 20-nt window is followed by the PAM {pam}.");
    }

    let mut out = format!("Top {} guide candidate(s) for PAM {pam}:\n", guides.len());
    for (rank, guide) in guides.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} {} (position {}, GC {:.0}%, score {})\n",
            rank + 1,
            guide.sequence,
            guide.pam,
            guide.start,
            guide.gc_content * 100.0,
            guide.score
        ));
    }
    out.trim_end().to_string()
}

pub fn format_pcr(report: &PcrReport) -> String {
    let mut out = if report.feasible {
        match report.product_length {
            Some(len) => format!("PCR looks feasible: expected product of {len} bp."),
            None => "Both primers bind the template, but the reverse site is not downstream of the forward site.".to_string(),
        }
    } else {
        "PCR is not feasible: at least one primer has no binding site on the template.".to_string()
    };

    out.push_str(&format!(
        "\nMelting temperatures: forward {:.1}°C, reverse {:.1}°C.",
        report.melting_temps.forward, report.melting_temps.reverse
    ));
    for warning in &report.warnings {
        out.push_str(&format!("\nWarning: {warning}"));
    }
    out
}

pub fn format_codons(organism: &str, result: &CodonOptimization) -> String {
    format!(
        "Codon-optimized for {organism} ({} substitution(s)):\n{}",
        result.substitution_count, result.optimized_sequence
    )
}

pub fn format_sequence_stats(file: &ParsedFileContext) -> String {
    let mut out = file.summary();
    out.push('.');
    if !file.composition.is_empty() {
        let counts: Vec<String> = file
            .composition
            .iter()
            .map(|(residue, count)| format!("{residue}: {count}"))
            .collect();
        out.push_str(&format!("\nComposition: {}", counts.join(", ")));
    }
    out
}

/// Stable message for a routing failure. Never includes provider error detail.
pub fn routing_failure_message(err: &RouterError) -> &'static str {
    match err {
        RouterError::NoEligibleProvider => {
            "No answer service is available for your plan right now. Please try again later."
        }
        RouterError::AllProvidersFailed { .. } => {
            "All answer services are temporarily unavailable. Please try again in a few minutes."
        }
        RouterError::Cancelled => "The request was cancelled.",
    }
}
