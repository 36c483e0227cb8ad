use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid sequence '{id}': {reason}")]
    InvalidSequence { id: String, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// One input sequence. Construction normalizes case and strips whitespace;
/// content validation is deferred to the analysis engines so a malformed
/// record can still flow through the pipeline as an error-tagged result.
#[derive(Debug, Clone)]
pub struct SequenceRecord {
    pub id: String,
    pub sequence: String,
}

impl SequenceRecord {
    pub fn new(id: impl Into<String>, raw: impl AsRef<str>) -> Self {
        let sequence: String = raw
            .as_ref()
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Self { id: id.into(), sequence }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Reject empty sequences and any symbol outside {A,C,G,T}.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sequence.is_empty() {
            return Err(AnalysisError::InvalidSequence {
                id: self.id.clone(),
                reason: "sequence is empty".to_string(),
            });
        }
        for (pos, b) in self.sequence.bytes().enumerate() {
            if !matches!(b, b'A' | b'C' | b'G' | b'T') {
                return Err(AnalysisError::InvalidSequence {
                    id: self.id.clone(),
                    reason: format!("symbol '{}' at position {pos} is not one of A/C/G/T", b as char),
                });
            }
        }
        Ok(())
    }
}

/// The five biophysical metrics of one sequence.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSet {
    /// Fraction of G+C bases, 0.0–1.0.
    pub gc_content: f64,
    /// Melting temperature in °C (Wallace rule or salt-adjusted, by length).
    pub melting_temperature: f64,
    /// Repeat-run score, 0.0–1.0; higher means more repetitive.
    pub homopolymer_score: f64,
    /// Single-nucleotide Shannon entropy in bits, 0.0–2.0.
    pub shannon_entropy: f64,
    /// Observed frequency per frame-0 codon. Codons absent from the
    /// sequence are absent from the map (frequency 0.0).
    pub codon_frequencies: HashMap<String, f64>,
    /// Deviation of codon usage from the uniform reference, 0.0–1.0.
    pub codon_bias: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TopologyScore {
    /// Count of non-overlapping self-complementary stems (crossing proxy).
    pub crossing_number: usize,
    /// Length-normalized stem density, 0.0–1.0.
    pub normalized_complexity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Raise by one band, saturating at `Critical`.
    pub fn escalate(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which individual signals breached their configured threshold.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ElevatedFlags {
    pub gc: bool,
    pub tm: bool,
    pub homopolymer: bool,
    pub entropy: bool,
    pub codon_bias: bool,
    pub topology: bool,
}

impl ElevatedFlags {
    pub fn count(&self) -> usize {
        [
            self.gc,
            self.tm,
            self.homopolymer,
            self.entropy,
            self.codon_bias,
            self.topology,
        ]
        .iter()
        .filter(|&&f| f)
        .count()
    }

    /// Names of the elevated signals, for reports and chart annotations.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.gc {
            out.push("gc");
        }
        if self.tm {
            out.push("tm");
        }
        if self.homopolymer {
            out.push("homopolymer");
        }
        if self.entropy {
            out.push("entropy");
        }
        if self.codon_bias {
            out.push("codon_bias");
        }
        if self.topology {
            out.push("topology");
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub flags: ElevatedFlags,
    /// Weighted aggregate deviation, 0.0–1.0; ranks sequences within a level.
    pub score: f64,
}

#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Analyzed {
        metrics: MetricSet,
        topology: TopologyScore,
        risk: RiskAssessment,
    },
    Failed {
        reason: String,
    },
}

/// Per-sequence result handed to reporting. The `Failed` outcome is how a
/// malformed record surfaces without aborting the rest of the run.
#[derive(Debug, Clone)]
pub struct SequenceAnalysisResult {
    pub id: String,
    pub length: usize,
    pub outcome: AnalysisOutcome,
}

impl SequenceAnalysisResult {
    pub fn is_analyzed(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Analyzed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_normalizes_case_and_whitespace() {
        let rec = SequenceRecord::new("s1", " ac gT\nTA ");
        assert_eq!(rec.sequence, "ACGTTA");
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let rec = SequenceRecord::new("s1", "  \n ");
        let err = rec.validate().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSequence { .. }));
    }

    #[test]
    fn ambiguity_codes_are_rejected() {
        let rec = SequenceRecord::new("s1", "ACGTN");
        let err = rec.validate().unwrap_err();
        assert!(err.to_string().contains("'N'"));
    }

    #[test]
    fn risk_levels_are_ordered_and_saturate() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(RiskLevel::High.escalate(), RiskLevel::Critical);
        assert_eq!(RiskLevel::Critical.escalate(), RiskLevel::Critical);
    }

    #[test]
    fn flag_count_matches_labels() {
        let flags = ElevatedFlags {
            gc: true,
            entropy: true,
            topology: true,
            ..Default::default()
        };
        assert_eq!(flags.count(), 3);
        assert_eq!(flags.labels(), vec!["gc", "entropy", "topology"]);
    }
}
