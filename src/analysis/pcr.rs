//! PCR primer feasibility check

use serde::{Deserialize, Serialize};

use crate::analysis::sequence::{gc_count, normalize, reverse_complement};

/// Primers shorter than this trigger a specificity warning
pub const MIN_PRIMER_LENGTH: usize = 18;

/// Maximum tolerated melting-temperature difference between primers (°C)
pub const MAX_TM_DIFFERENCE: f64 = 5.0;

/// Melting temperatures of a primer pair in °C
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimerTemperatures {
    pub forward: f64,
    pub reverse: f64,
}

impl PrimerTemperatures {
    pub fn difference(&self) -> f64 {
        (self.forward - self.reverse).abs()
    }
}

/// Result of a primer-pair check against a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcrReport {
    /// Both binding sites were found on the template
    pub feasible: bool,
    /// Amplicon length in bp, when the reverse site lies downstream of the forward site
    pub product_length: Option<usize>,
    pub melting_temps: PrimerTemperatures,
    /// Non-fatal design issues
    pub warnings: Vec<String>,
}

/// Melting temperature estimate: `64.9 + 41 * (GC - 16.4) / length`.
///
/// Returns 0.0 for an empty primer.
pub fn melting_temperature(primer: &str) -> f64 {
    let primer = normalize(primer);
    if primer.is_empty() {
        return 0.0;
    }
    let gc = gc_count(&primer) as f64;
    64.9 + 41.0 * (gc - 16.4) / primer.len() as f64
}

/// Checks whether `forward` and `reverse` can amplify a product from `template`.
///
/// The forward primer must occur verbatim on the template and the reverse
/// complement of the reverse primer must occur too. Tm mismatch and short
/// primers only produce warnings.
pub fn pcr_feasibility(forward: &str, reverse: &str, template: &str) -> PcrReport {
    let forward = normalize(forward);
    let reverse = normalize(reverse);
    let template = normalize(template);

    let melting_temps = PrimerTemperatures {
        forward: melting_temperature(&forward),
        reverse: melting_temperature(&reverse),
    };

    let mut warnings = Vec::new();
    if melting_temps.difference() > MAX_TM_DIFFERENCE {
        warnings.push(format!(
            "Melting temperatures differ by {:.1}°C (more than {:.0}°C)",
            melting_temps.difference(),
            MAX_TM_DIFFERENCE
        ));
    }
    if forward.len() < MIN_PRIMER_LENGTH {
        warnings.push(format!(
            "Forward primer is {} nt, shorter than {} nt",
            forward.len(),
            MIN_PRIMER_LENGTH
        ));
    }
    if reverse.len() < MIN_PRIMER_LENGTH {
        warnings.push(format!(
            "Reverse primer is {} nt, shorter than {} nt",
            reverse.len(),
            MIN_PRIMER_LENGTH
        ));
    }

    if forward.is_empty() || reverse.is_empty() || template.is_empty() {
        return PcrReport {
            feasible: false,
            product_length: None,
            melting_temps,
            warnings,
        };
    }

    let reverse_site = reverse_complement(&reverse);
    let forward_pos = template.find(&forward);
    let reverse_found = template.contains(&reverse_site);
    let feasible = forward_pos.is_some() && reverse_found;

    let product_length = forward_pos.and_then(|start| {
        template[start..]
            .find(&reverse_site)
            .map(|offset| offset + reverse_site.len())
            .filter(|&len| len >= forward.len())
    });

    PcrReport {
        feasible,
        product_length,
        melting_temps,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "GGATCCATGGCTAGCAAGGGCGAGGAGCTGTTCACCGGGGTGGTGCCCATCCTGGTCGAGCTGGACGGCGACGTAAACGGCCACAAGTTCAGCGTGTCCGGCGAGGGCGAGGGCGATGCCACCTACGGCAAGCTGACCCTGAAG";

    #[test]
    fn test_melting_temperature_formula() {
        // 20-mer with 10 GC
        let tm = melting_temperature("ATCGATCGATCGATCGATCG");
        let expected = 64.9 + 41.0 * (10.0 - 16.4) / 20.0;
        assert!((tm - expected).abs() < 1e-9);
    }

    #[test]
    fn test_melting_temperature_empty() {
        assert_eq!(melting_temperature(""), 0.0);
    }

    #[test]
    fn test_feasible_pair() {
        let forward = "ATGGCTAGCAAGGGCGAGGA";
        // Reverse complement of CCTACGGCAAGCTGACCCTG
        let reverse = reverse_complement("CCTACGGCAAGCTGACCCTG");
        let report = pcr_feasibility(forward, &reverse, TEMPLATE);

        assert!(report.feasible);
        let start = TEMPLATE.find(forward).unwrap();
        let end = TEMPLATE.find("CCTACGGCAAGCTGACCCTG").unwrap() + 20;
        assert_eq!(report.product_length, Some(end - start));
    }

    #[test]
    fn test_reverse_primer_must_be_reverse_complemented() {
        // Passing the top-strand sequence as the reverse primer does not bind
        let report = pcr_feasibility("ATGGCTAGCAAGGGCGAGGA", "CCTACGGCAAGCTGACCCTG", TEMPLATE);
        assert!(!report.feasible);
        assert_eq!(report.product_length, None);
    }

    #[test]
    fn test_missing_forward_site() {
        let reverse = reverse_complement("CCTACGGCAAGCTGACCCTG");
        let report = pcr_feasibility("TTTTTTTTTTTTTTTTTTTT", &reverse, TEMPLATE);
        assert!(!report.feasible);
    }

    #[test]
    fn test_short_primer_and_tm_warnings() {
        let report = pcr_feasibility("ATATATATAT", "GCGCGCGCGCGCGCGCGCGC", TEMPLATE);
        assert!(report.warnings.iter().any(|w| w.contains("Forward primer is 10 nt")));
        assert!(report.warnings.iter().any(|w| w.contains("Melting temperatures differ")));
        assert!(!report.warnings.iter().any(|w| w.contains("Reverse primer is")));
    }

    #[test]
    fn test_no_warnings_for_balanced_pair() {
        let forward = "ATGGCTAGCAAGGGCGAGGA";
        let reverse = reverse_complement("CCTACGGCAAGCTGACCCTG");
        let report = pcr_feasibility(forward, &reverse, TEMPLATE);
        assert!(report.melting_temps.difference() <= MAX_TM_DIFFERENCE);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_degenerate_input_fails_soft() {
        let report = pcr_feasibility("", "", "");
        assert!(!report.feasible);
        assert_eq!(report.melting_temps.forward, 0.0);
        assert_eq!(report.warnings.len(), 2);
    }
}
