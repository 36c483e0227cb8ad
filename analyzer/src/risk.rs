//! Fusion of the five biophysical metrics and the topology score into one
//! ordinal risk level.
//!
//! Each signal is flagged independently against its configured band or
//! threshold, deviations are combined into a weighted aggregate in [0,1],
//! and fixed score bands assign the level. A co-occurrence override raises
//! the level one band when enough weak signals line up without any single
//! one dominating.

use crate::config::AnalysisConfig;
use crate::models::{AnalysisError, ElevatedFlags, MetricSet, RiskAssessment, RiskLevel, TopologyScore};

#[derive(Debug)]
pub struct RiskClassifier {
    config: AnalysisConfig,
}

impl RiskClassifier {
    /// Validates the configuration eagerly; a malformed one would silently
    /// mis-classify every sequence.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Read access to the thresholds and weights, for chart annotation.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Deterministic and total: every valid metric/topology pair maps to
    /// exactly one level.
    pub fn classify(&self, metrics: &MetricSet, topology: &TopologyScore) -> RiskAssessment {
        let cfg = &self.config;

        let flags = ElevatedFlags {
            gc: !cfg.gc_band.contains(metrics.gc_content),
            tm: !cfg.tm_band.contains(metrics.melting_temperature),
            homopolymer: metrics.homopolymer_score >= cfg.homopolymer_threshold,
            entropy: metrics.shannon_entropy < cfg.entropy_threshold,
            codon_bias: metrics.codon_bias >= cfg.codon_bias_threshold,
            topology: topology.normalized_complexity >= cfg.topology_threshold,
        };

        let deviations = [
            gc_deviation(metrics.gc_content, cfg),
            tm_deviation(metrics.melting_temperature, cfg),
            past_threshold(metrics.homopolymer_score, cfg.homopolymer_threshold),
            entropy_deviation(metrics.shannon_entropy, cfg),
            past_threshold(metrics.codon_bias, cfg.codon_bias_threshold),
            past_threshold(topology.normalized_complexity, cfg.topology_threshold),
        ];
        let score: f64 = cfg
            .weights
            .as_array()
            .iter()
            .zip(deviations.iter())
            .map(|(w, d)| w * d)
            .sum();

        let mut level = level_for_score(score, cfg);
        if flags.count() >= cfg.override_flag_count {
            level = level.escalate();
        }

        RiskAssessment { level, flags, score }
    }
}

/// Distance outside the GC band, normalized so hitting the domain bound
/// (0.0 or 1.0) scores a full deviation of 1.
fn gc_deviation(gc: f64, cfg: &AnalysisConfig) -> f64 {
    let band = &cfg.gc_band;
    if gc < band.lower && band.lower > 0.0 {
        ((band.lower - gc) / band.lower).clamp(0.0, 1.0)
    } else if gc > band.upper && band.upper < 1.0 {
        ((gc - band.upper) / (1.0 - band.upper)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Tm has no natural domain bound, so the distance past the band edge is
/// normalized by the band width.
fn tm_deviation(tm: f64, cfg: &AnalysisConfig) -> f64 {
    let band = &cfg.tm_band;
    let past = if tm < band.lower {
        band.lower - tm
    } else if tm > band.upper {
        tm - band.upper
    } else {
        return 0.0;
    };
    (past / band.width()).clamp(0.0, 1.0)
}

/// Low entropy signals repetitive, structure-prone sequence.
fn entropy_deviation(entropy: f64, cfg: &AnalysisConfig) -> f64 {
    if entropy < cfg.entropy_threshold {
        ((cfg.entropy_threshold - entropy) / cfg.entropy_threshold).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Distance past an upper threshold in [0,1), rescaled onto [0,1].
fn past_threshold(value: f64, threshold: f64) -> f64 {
    if value >= threshold {
        ((value - threshold) / (1.0 - threshold)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn level_for_score(score: f64, cfg: &AnalysisConfig) -> RiskLevel {
    let bands = &cfg.score_bands;
    if score < bands.medium {
        RiskLevel::Low
    } else if score < bands.high {
        RiskLevel::Medium
    } else if score < bands.critical {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}
