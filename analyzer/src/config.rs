//! Thresholds, bands and weights consumed by the analysis engines.
//!
//! Every constant named in the classification policy lives here so a run can
//! be reproduced from the `run_config.json` artifact alone.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::AnalysisError;

/// A closed acceptable interval; values outside it count as elevated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
}

impl Band {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Per-signal weights for the aggregate risk score. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricWeights {
    pub gc: f64,
    pub tm: f64,
    pub homopolymer: f64,
    pub entropy: f64,
    pub codon_bias: f64,
    pub topology: f64,
}

impl MetricWeights {
    pub fn sum(&self) -> f64 {
        self.gc + self.tm + self.homopolymer + self.entropy + self.codon_bias + self.topology
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.gc,
            self.tm,
            self.homopolymer,
            self.entropy,
            self.codon_bias,
            self.topology,
        ]
    }
}

/// Lower bounds of the medium/high/critical aggregate-score bands.
/// Scores below `medium` classify as low.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreBands {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Acceptable GC fraction band; the synthetic-biology optimum.
    pub gc_band: Band,
    /// Acceptable melting-temperature band in °C.
    pub tm_band: Band,
    /// Homopolymer score at or above this is elevated.
    pub homopolymer_threshold: f64,
    /// Shannon entropy below this (bits) is elevated.
    pub entropy_threshold: f64,
    /// Codon bias at or above this is elevated.
    pub codon_bias_threshold: f64,
    /// Normalized topology complexity at or above this is elevated.
    pub topology_threshold: f64,
    /// Shortest complementary run that counts as a stem.
    pub min_stem_length: usize,
    /// Largest alignment offset scanned for stems; `None` means the full
    /// sequence length.
    pub max_pairing_offset: Option<usize>,
    /// Sequences shorter than this use the Wallace Tm rule; the rest use the
    /// salt-adjusted formula.
    pub wallace_crossover: usize,
    pub score_bands: ScoreBands,
    pub weights: MetricWeights,
    /// This many elevated signals escalate the level by one band.
    pub override_flag_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gc_band: Band { lower: 0.50, upper: 0.60 },
            tm_band: Band { lower: 55.0, upper: 75.0 },
            homopolymer_threshold: 0.3,
            entropy_threshold: 1.5,
            codon_bias_threshold: 0.5,
            topology_threshold: 0.4,
            min_stem_length: 3,
            max_pairing_offset: None,
            wallace_crossover: 14,
            score_bands: ScoreBands { medium: 0.25, high: 0.50, critical: 0.75 },
            weights: MetricWeights {
                gc: 0.15,
                tm: 0.10,
                homopolymer: 0.20,
                entropy: 0.20,
                codon_bias: 0.10,
                topology: 0.25,
            },
            override_flag_count: 3,
        }
    }
}

impl AnalysisConfig {
    /// Reject malformed configurations before any sequence is touched.
    /// A bad configuration would silently mis-classify every sequence.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let bad = |msg: String| Err(AnalysisError::InvalidConfiguration(msg));

        for (name, w) in [
            ("gc", self.weights.gc),
            ("tm", self.weights.tm),
            ("homopolymer", self.weights.homopolymer),
            ("entropy", self.weights.entropy),
            ("codon_bias", self.weights.codon_bias),
            ("topology", self.weights.topology),
        ] {
            if w < 0.0 {
                return bad(format!("weight '{name}' is negative ({w})"));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return bad(format!("weights sum to {sum}, expected 1.0"));
        }

        if self.gc_band.lower >= self.gc_band.upper {
            return bad(format!(
                "gc band is inverted or empty ({}..{})",
                self.gc_band.lower, self.gc_band.upper
            ));
        }
        if self.gc_band.lower < 0.0 || self.gc_band.upper > 1.0 {
            return bad("gc band must lie within [0, 1]".to_string());
        }
        if self.tm_band.lower >= self.tm_band.upper {
            return bad(format!(
                "tm band is inverted or empty ({}..{})",
                self.tm_band.lower, self.tm_band.upper
            ));
        }

        for (name, t) in [
            ("homopolymer_threshold", self.homopolymer_threshold),
            ("codon_bias_threshold", self.codon_bias_threshold),
            ("topology_threshold", self.topology_threshold),
        ] {
            if !(0.0..1.0).contains(&t) {
                return bad(format!("{name} must lie within [0, 1), got {t}"));
            }
        }
        if self.entropy_threshold <= 0.0 || self.entropy_threshold > 2.0 {
            return bad(format!(
                "entropy_threshold must lie within (0, 2], got {}",
                self.entropy_threshold
            ));
        }

        if self.min_stem_length == 0 {
            return bad("min_stem_length must be at least 1".to_string());
        }
        if self.wallace_crossover == 0 {
            return bad("wallace_crossover must be at least 1".to_string());
        }
        if self.override_flag_count == 0 {
            return bad("override_flag_count must be at least 1".to_string());
        }

        let b = &self.score_bands;
        let ascending = 0.0 < b.medium && b.medium < b.high && b.high < b.critical && b.critical < 1.0;
        if !ascending {
            return bad(format!(
                "score bands must be strictly ascending within (0, 1): {}/{}/{}",
                b.medium, b.high, b.critical
            ));
        }

        Ok(())
    }

    /// Write the resolved configuration next to the other run artifacts so
    /// charts and readers can recover the decision boundaries.
    pub fn write_run_config(&self, output_dir: &Path) -> anyhow::Result<()> {
        let path = output_dir.join("run_config.json");
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
