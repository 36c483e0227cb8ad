//! The five biophysical metrics: GC content, melting temperature,
//! homopolymer complexity, Shannon entropy and codon usage bias.
//!
//! All computations are pure functions of the sequence and the configured
//! Wallace crossover; re-running on the same input is bit-identical.

use std::collections::HashMap;

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::config::AnalysisConfig;
use crate::models::{AnalysisError, MetricSet, SequenceRecord};

/// Degrees of freedom for the 64-codon uniform reference.
const CODON_DF: f64 = 63.0;

pub struct BiophysicalMetrics {
    wallace_crossover: usize,
    codon_reference: ChiSquared,
}

impl BiophysicalMetrics {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            wallace_crossover: config.wallace_crossover,
            codon_reference: ChiSquared::new(CODON_DF)
                .expect("63 degrees of freedom is a valid chi-squared distribution"),
        }
    }

    /// Compute all five metrics for one record. Fails on an empty sequence
    /// or any symbol outside {A,C,G,T}; no partial results.
    pub fn analyze(&self, record: &SequenceRecord) -> Result<MetricSet, AnalysisError> {
        record.validate()?;
        let seq = record.sequence.as_bytes();

        let (codon_frequencies, codon_bias) = self.codon_usage(seq);

        Ok(MetricSet {
            gc_content: gc_content(seq),
            melting_temperature: self.melting_temperature(seq),
            homopolymer_score: homopolymer_score(seq),
            shannon_entropy: shannon_entropy(seq),
            codon_frequencies,
            codon_bias,
        })
    }

    /// Wallace rule for short oligomers, salt-adjusted empirical formula for
    /// everything at or past the configured crossover length.
    fn melting_temperature(&self, seq: &[u8]) -> f64 {
        let gc = seq.iter().filter(|&&b| b == b'G' || b == b'C').count() as f64;
        let at = seq.len() as f64 - gc;
        if seq.len() < self.wallace_crossover {
            2.0 * at + 4.0 * gc
        } else {
            64.9 + 41.0 * (gc - 16.4) / seq.len() as f64
        }
    }

    /// Observed frame-0 codon frequencies plus a scalar bias score: the
    /// chi-squared statistic against the uniform 64-codon reference, mapped
    /// to [0,1] through the chi-squared CDF. Trailing 1–2 bases are ignored;
    /// fewer than one full codon yields bias 0 and an empty map.
    fn codon_usage(&self, seq: &[u8]) -> (HashMap<String, f64>, f64) {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for codon in seq.chunks_exact(3) {
            let key = String::from_utf8_lossy(codon).into_owned();
            *counts.entry(key).or_insert(0) += 1;
        }
        let total: usize = counts.values().sum();
        if total == 0 {
            return (HashMap::new(), 0.0);
        }

        let expected = total as f64 / 64.0;
        let observed_stat: f64 = counts
            .values()
            .map(|&o| {
                let d = o as f64 - expected;
                d * d / expected
            })
            .sum();
        // Codons never observed each contribute (0 - e)^2 / e = e.
        let absent = 64 - counts.len();
        let statistic = observed_stat + absent as f64 * expected;

        let frequencies = counts
            .into_iter()
            .map(|(codon, count)| (codon, count as f64 / total as f64))
            .collect();
        (frequencies, self.codon_reference.cdf(statistic))
    }
}

fn gc_content(seq: &[u8]) -> f64 {
    let gc = seq.iter().filter(|&&b| b == b'G' || b == b'C').count();
    gc as f64 / seq.len() as f64
}

/// Sum of (run_length - 1) over maximal single-nucleotide runs, divided by
/// the sequence length and capped at 1.0. A run of length 1 contributes 0.
fn homopolymer_score(seq: &[u8]) -> f64 {
    let mut excess = 0usize;
    let mut run = 1usize;
    for i in 1..seq.len() {
        if seq[i] == seq[i - 1] {
            run += 1;
        } else {
            excess += run - 1;
            run = 1;
        }
    }
    excess += run - 1;
    (excess as f64 / seq.len() as f64).min(1.0)
}

/// Shannon entropy in bits over single-nucleotide frequencies; zero-count
/// symbols contribute 0, so the result is 0.0–2.0 for the 4-letter alphabet.
fn shannon_entropy(seq: &[u8]) -> f64 {
    let mut counts = [0usize; 4];
    for &b in seq {
        let slot = match b {
            b'A' => 0,
            b'C' => 1,
            b'G' => 2,
            _ => 3,
        };
        counts[slot] += 1;
    }
    let n = seq.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_for(seq: &str) -> MetricSet {
        let engine = BiophysicalMetrics::new(&AnalysisConfig::default());
        engine.analyze(&SequenceRecord::new("t", seq)).unwrap()
    }

    #[test]
    fn poly_a_reference_values() {
        let m = metrics_for("AAAAAAAAAA");
        assert_eq!(m.gc_content, 0.0);
        assert_eq!(m.shannon_entropy, 0.0);
        assert_eq!(m.homopolymer_score, 0.9);
        // Length 10 is below the crossover, so the Wallace rule applies.
        assert_eq!(m.melting_temperature, 20.0);
        // Three AAA codons against a uniform reference: heavily biased.
        assert!(m.codon_bias > 0.99);
        assert_eq!(m.codon_frequencies.get("AAA"), Some(&1.0));
    }

    #[test]
    fn repeating_atgc_reference_values() {
        let m = metrics_for("ATGCATGCATGC");
        assert_eq!(m.gc_content, 0.5);
        assert_eq!(m.shannon_entropy, 2.0);
        assert_eq!(m.homopolymer_score, 0.0);
        assert_eq!(m.melting_temperature, 2.0 * 6.0 + 4.0 * 6.0);
    }

    #[test]
    fn salt_adjusted_formula_past_crossover() {
        // Length 16 with 8 G/C bases.
        let m = metrics_for("ATGCATGCATGCATGC");
        let expected = 64.9 + 41.0 * (8.0 - 16.4) / 16.0;
        assert!((m.melting_temperature - expected).abs() < 1e-12);
    }

    #[test]
    fn wallace_applies_strictly_below_crossover() {
        let engine = BiophysicalMetrics::new(&AnalysisConfig::default());
        // 13 bases: Wallace. 14 bases: salt-adjusted.
        let m13 = engine.analyze(&SequenceRecord::new("t", "AAAAAAAAAAAAA")).unwrap();
        assert_eq!(m13.melting_temperature, 26.0);
        let m14 = engine.analyze(&SequenceRecord::new("t", "AAAAAAAAAAAAAA")).unwrap();
        let expected = 64.9 + 41.0 * (0.0 - 16.4) / 14.0;
        assert!((m14.melting_temperature - expected).abs() < 1e-12);
    }

    #[test]
    fn metric_ranges_hold() {
        for seq in ["A", "ACGT", "GGGGGGGG", "ATATATATAT", "ACGTACGTACGTACGTACGT"] {
            let m = metrics_for(seq);
            assert!((0.0..=1.0).contains(&m.gc_content), "{seq}");
            assert!((0.0..=2.0).contains(&m.shannon_entropy), "{seq}");
            assert!((0.0..=1.0).contains(&m.homopolymer_score), "{seq}");
            assert!((0.0..=1.0).contains(&m.codon_bias), "{seq}");
        }
    }

    #[test]
    fn longer_runs_never_score_lower() {
        // Same length, the second sequence extends the leading run.
        let shorter_run = metrics_for("AATGCTGC").homopolymer_score;
        let longer_run = metrics_for("AAATGTGC").homopolymer_score;
        assert!(longer_run >= shorter_run);
    }

    #[test]
    fn sub_codon_sequence_has_zero_bias() {
        let m = metrics_for("AT");
        assert_eq!(m.codon_bias, 0.0);
        assert!(m.codon_frequencies.is_empty());
    }

    #[test]
    fn trailing_bases_are_ignored_for_codons() {
        // Two full codons, two leftover bases.
        let m = metrics_for("ATGGGGCA");
        let total: f64 = m.codon_frequencies.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(m.codon_frequencies.len(), 2);
    }

    #[test]
    fn analysis_is_idempotent() {
        let engine = BiophysicalMetrics::new(&AnalysisConfig::default());
        let rec = SequenceRecord::new("t", "ACGTTGCAACGGT");
        let a = engine.analyze(&rec).unwrap();
        let b = engine.analyze(&rec).unwrap();
        assert_eq!(a.gc_content.to_bits(), b.gc_content.to_bits());
        assert_eq!(a.melting_temperature.to_bits(), b.melting_temperature.to_bits());
        assert_eq!(a.shannon_entropy.to_bits(), b.shannon_entropy.to_bits());
        assert_eq!(a.codon_bias.to_bits(), b.codon_bias.to_bits());
    }

    #[test]
    fn invalid_symbols_are_rejected_not_dropped() {
        let engine = BiophysicalMetrics::new(&AnalysisConfig::default());
        let err = engine.analyze(&SequenceRecord::new("t", "ACGNACGT")).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSequence { .. }));
    }
}
