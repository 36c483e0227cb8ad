//! Knot-inspired topological complexity from sequence self-pairing.
//!
//! Self-complementary regions are the structural precursor of hairpins and
//! knots in single-stranded DNA. Sliding the reverse complement across the
//! sequence finds candidate stems (inverted repeats); counting the
//! non-overlapping ones gives a crossing-number proxy that is monotone and
//! reproducible without simulating folding energetics.

use crate::config::AnalysisConfig;
use crate::models::{AnalysisError, SequenceRecord, TopologyScore};

/// A candidate stem: the longest complementary run at one alignment offset.
/// `a` is the run's span in the sequence, `b` the span of the region it
/// pairs with; both are inclusive position ranges.
#[derive(Debug, Clone, Copy)]
struct Stem {
    len: usize,
    a: (usize, usize),
    b: (usize, usize),
}

impl Stem {
    fn start(&self) -> usize {
        self.a.0.min(self.b.0)
    }

    fn overlaps(&self, other: &Stem) -> bool {
        let spans = |s: &Stem| [s.a, s.b];
        spans(self)
            .iter()
            .any(|x| spans(other).iter().any(|y| x.0 <= y.1 && y.0 <= x.1))
    }
}

pub struct TopologyAnalyzer {
    min_stem_length: usize,
    max_pairing_offset: Option<usize>,
}

impl TopologyAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            min_stem_length: config.min_stem_length,
            max_pairing_offset: config.max_pairing_offset,
        }
    }

    /// Score one record. Validation failures are the same as for the
    /// biophysical metrics: empty or non-ACGT input is rejected outright.
    pub fn analyze(&self, record: &SequenceRecord) -> Result<TopologyScore, AnalysisError> {
        record.validate()?;
        let seq = record.sequence.as_bytes();
        let rc = reverse_complement(seq);
        let n = seq.len();
        let max_offset = self.max_pairing_offset.unwrap_or(n).min(n) as isize;

        let mut candidates = Vec::new();
        for offset in -max_offset..=max_offset {
            if let Some(stem) = longest_run_at_offset(seq, &rc, offset) {
                if stem.len >= self.min_stem_length {
                    candidates.push(stem);
                }
            }
        }

        // Greedy longest-first; ties fall to the leftmost stem. Accepted
        // stems block both of their paired regions.
        candidates.sort_by(|x, y| y.len.cmp(&x.len).then(x.start().cmp(&y.start())));
        let mut selected: Vec<Stem> = Vec::new();
        for stem in candidates {
            if !selected.iter().any(|s| s.overlaps(&stem)) {
                selected.push(stem);
            }
        }

        let crossing_number = selected.len();
        let density = crossing_number as f64 * self.min_stem_length as f64 / n as f64;
        Ok(TopologyScore {
            crossing_number,
            normalized_complexity: density.min(1.0),
        })
    }
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'T' => b'A',
            b'G' => b'C',
            _ => b'G',
        })
        .collect()
}

/// The longest run of positions where `seq[i]` matches `rc[i + offset]`,
/// i.e. where the base at `i` can pair with the base at `n-1-i-offset`.
/// Returns the leftmost longest run, or None when the alignment has no
/// matching positions.
fn longest_run_at_offset(seq: &[u8], rc: &[u8], offset: isize) -> Option<Stem> {
    let n = seq.len() as isize;
    let lo = 0.max(-offset) as usize;
    let hi = n.min(n - offset) as usize;
    if lo >= hi {
        return None;
    }

    let mut best: Option<(usize, usize)> = None; // (start, len)
    let mut run_start = lo;
    let mut run_len = 0usize;
    for i in lo..hi {
        let j = (i as isize + offset) as usize;
        if seq[i] == rc[j] {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if best.map_or(true, |(_, l)| run_len > l) {
                best = Some((run_start, run_len));
            }
        } else {
            run_len = 0;
        }
    }

    best.map(|(start, len)| {
        let n = seq.len();
        // rc index j maps back to sequence position n-1-j: the run at
        // [start, start+len) pairs with the mirrored span below.
        let j_last = (start + len - 1) as isize + offset;
        let j_first = start as isize + offset;
        let b = ((n as isize - 1 - j_last) as usize, (n as isize - 1 - j_first) as usize);
        Stem { len, a: (start, start + len - 1), b }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_for(seq: &str) -> TopologyScore {
        let analyzer = TopologyAnalyzer::new(&AnalysisConfig::default());
        analyzer.analyze(&SequenceRecord::new("t", seq)).unwrap()
    }

    #[test]
    fn reverse_complement_basics() {
        assert_eq!(reverse_complement(b"ACGT"), b"ACGT".to_vec());
        assert_eq!(reverse_complement(b"AAACCC"), b"GGGTTT".to_vec());
        assert_eq!(reverse_complement(b"GGGAAACCC"), b"GGGTTTCCC".to_vec());
    }

    #[test]
    fn homopolymer_cannot_pair_with_itself() {
        // A pairs with T, never with another A: no stems at any offset.
        let t = score_for("AAAAAAAAAA");
        assert_eq!(t.crossing_number, 0);
        assert_eq!(t.normalized_complexity, 0.0);
    }

    #[test]
    fn hairpin_stem_is_counted_once() {
        // GGG...CCC folds back on itself: one stem, both arms blocked.
        let t = score_for("GGGAAACCC");
        assert_eq!(t.crossing_number, 1);
        assert!((t.normalized_complexity - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn repeating_unit_collapses_to_one_stem() {
        // ATGC repeats self-pair at shift 2; the greedy pass keeps the
        // longest alignment and drops the shorter overlapping ones.
        let t = score_for("ATGCATGCATGC");
        assert_eq!(t.crossing_number, 1);
        assert!((t.normalized_complexity - 0.25).abs() < 1e-12);
    }

    #[test]
    fn complexity_stays_normalized() {
        for seq in ["A", "ACGT", "GGGAAACCC", "GCGCGCGCGCGCGCGC", "ATATATATATAT"] {
            let t = score_for(seq);
            assert!(
                (0.0..=1.0).contains(&t.normalized_complexity),
                "{seq}: {}",
                t.normalized_complexity
            );
        }
    }

    #[test]
    fn reverse_complement_symmetry() {
        for seq in ["GGGAAACCC", "ATGCATGCATGC", "AAACCC", "AAAAAAAAAA"] {
            let analyzer = TopologyAnalyzer::new(&AnalysisConfig::default());
            let fwd = analyzer.analyze(&SequenceRecord::new("f", seq)).unwrap();
            let rc = String::from_utf8(reverse_complement(seq.as_bytes())).unwrap();
            let rev = analyzer.analyze(&SequenceRecord::new("r", &rc)).unwrap();
            assert_eq!(
                fwd.normalized_complexity, rev.normalized_complexity,
                "asymmetric for {seq}"
            );
        }
    }

    #[test]
    fn short_stems_below_minimum_are_ignored() {
        // GC pairs with GC only two bases deep: below the default minimum.
        let t = score_for("GCAAA");
        assert_eq!(t.crossing_number, 0);
    }

    #[test]
    fn bounded_offset_window_limits_stems() {
        let mut cfg = AnalysisConfig::default();
        cfg.max_pairing_offset = Some(0);
        let analyzer = TopologyAnalyzer::new(&cfg);
        // The ATGC-repeat stem lives at offset 2 and disappears when the
        // window excludes it.
        let t = analyzer
            .analyze(&SequenceRecord::new("t", "ATGCATGCATGC"))
            .unwrap();
        assert_eq!(t.crossing_number, 0);
    }

    #[test]
    fn analysis_is_idempotent() {
        let analyzer = TopologyAnalyzer::new(&AnalysisConfig::default());
        let rec = SequenceRecord::new("t", "GGGAAACCCATGCAT");
        let a = analyzer.analyze(&rec).unwrap();
        let b = analyzer.analyze(&rec).unwrap();
        assert_eq!(a.crossing_number, b.crossing_number);
        assert_eq!(
            a.normalized_complexity.to_bits(),
            b.normalized_complexity.to_bits()
        );
    }

    #[test]
    fn validation_is_delegated() {
        let analyzer = TopologyAnalyzer::new(&AnalysisConfig::default());
        assert!(analyzer.analyze(&SequenceRecord::new("t", "")).is_err());
        assert!(analyzer.analyze(&SequenceRecord::new("t", "ACGU")).is_err());
    }
}
