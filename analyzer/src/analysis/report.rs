//! End-of-run reporting: the per-sequence results table and the run summary.
//!
//! Aggregation across sequences lives here, outside the analysis engines,
//! so the core stays a set of independent per-sequence functions.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::models::{AnalysisOutcome, RiskLevel, SequenceAnalysisResult};

#[derive(Debug, Serialize)]
pub struct FailedSequence {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct RiskBucket {
    pub level: RiskLevel,
    pub count: usize,
}

/// Mean metric values over the successfully analyzed sequences; zero when
/// nothing analyzed.
#[derive(Debug, Serialize)]
pub struct MeanMetrics {
    pub gc_content: f64,
    pub melting_temperature: f64,
    pub shannon_entropy: f64,
    pub homopolymer_score: f64,
    pub normalized_complexity: f64,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub failures: Vec<FailedSequence>,
    pub risk_distribution: Vec<RiskBucket>,
    pub means: MeanMetrics,
}

pub fn summarize(results: &[SequenceAnalysisResult]) -> RunSummary {
    let mut failures = Vec::new();
    let mut counts = [0usize; 4];
    let mut sums = [0.0f64; 5];
    let mut analyzed = 0usize;

    for result in results {
        match &result.outcome {
            AnalysisOutcome::Analyzed { metrics, topology, risk } => {
                analyzed += 1;
                counts[risk.level as usize] += 1;
                sums[0] += metrics.gc_content;
                sums[1] += metrics.melting_temperature;
                sums[2] += metrics.shannon_entropy;
                sums[3] += metrics.homopolymer_score;
                sums[4] += topology.normalized_complexity;
            }
            AnalysisOutcome::Failed { reason } => failures.push(FailedSequence {
                id: result.id.clone(),
                reason: reason.clone(),
            }),
        }
    }

    let n = if analyzed > 0 { analyzed as f64 } else { 1.0 };
    RunSummary {
        total: results.len(),
        analyzed,
        failed: failures.len(),
        failures,
        risk_distribution: RiskLevel::ALL
            .iter()
            .map(|&level| RiskBucket { level, count: counts[level as usize] })
            .collect(),
        means: MeanMetrics {
            gc_content: sums[0] / n,
            melting_temperature: sums[1] / n,
            shannon_entropy: sums[2] / n,
            homopolymer_score: sums[3] / n,
            normalized_complexity: sums[4] / n,
        },
    }
}

/// The end-of-pipeline report: how many sequences made it through, and
/// which ones did not and why.
pub fn log_summary(summary: &RunSummary) {
    info!(
        "analyzed {}/{} sequences ({} failed)",
        summary.analyzed, summary.total, summary.failed
    );
    for bucket in &summary.risk_distribution {
        info!("  risk {:<8} {}", bucket.level.to_string(), bucket.count);
    }
    for failure in &summary.failures {
        warn!("  failed {}: {}", failure.id, failure.reason);
    }
}

pub fn write_summary_json(summary: &RunSummary, output_dir: &Path) -> anyhow::Result<()> {
    let path = output_dir.join("summary.json");
    serde_json::to_writer_pretty(File::create(&path)?, summary)?;
    info!("run summary saved to {}", path.display());
    Ok(())
}

/// One row per input sequence, error-tagged rows included; metric columns
/// are null for failed rows.
pub fn results_dataframe(results: &[SequenceAnalysisResult]) -> PolarsResult<DataFrame> {
    let n = results.len();
    let mut ids = Vec::with_capacity(n);
    let mut statuses = Vec::with_capacity(n);
    let mut errors: Vec<Option<String>> = Vec::with_capacity(n);
    let mut lengths: Vec<i64> = Vec::with_capacity(n);
    let mut gc: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut tm: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut homopolymer: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut entropy: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut codon_bias: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut crossings: Vec<Option<i64>> = Vec::with_capacity(n);
    let mut complexity: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut levels: Vec<Option<String>> = Vec::with_capacity(n);
    let mut scores: Vec<Option<f64>> = Vec::with_capacity(n);
    let mut elevated: Vec<Option<String>> = Vec::with_capacity(n);

    for result in results {
        ids.push(result.id.clone());
        lengths.push(result.length as i64);
        match &result.outcome {
            AnalysisOutcome::Analyzed { metrics, topology, risk } => {
                statuses.push("analyzed".to_string());
                errors.push(None);
                gc.push(Some(metrics.gc_content));
                tm.push(Some(metrics.melting_temperature));
                homopolymer.push(Some(metrics.homopolymer_score));
                entropy.push(Some(metrics.shannon_entropy));
                codon_bias.push(Some(metrics.codon_bias));
                crossings.push(Some(topology.crossing_number as i64));
                complexity.push(Some(topology.normalized_complexity));
                levels.push(Some(risk.level.to_string()));
                scores.push(Some(risk.score));
                elevated.push(Some(risk.flags.labels().join(",")));
            }
            AnalysisOutcome::Failed { reason } => {
                statuses.push("failed".to_string());
                errors.push(Some(reason.clone()));
                gc.push(None);
                tm.push(None);
                homopolymer.push(None);
                entropy.push(None);
                codon_bias.push(None);
                crossings.push(None);
                complexity.push(None);
                levels.push(None);
                scores.push(None);
                elevated.push(None);
            }
        }
    }

    DataFrame::new(vec![
        Column::from(Series::new(PlSmallStr::from("id"), ids)),
        Column::from(Series::new(PlSmallStr::from("status"), statuses)),
        Column::from(Series::new(PlSmallStr::from("error"), errors)),
        Column::from(Series::new(PlSmallStr::from("length"), lengths)),
        Column::from(Series::new(PlSmallStr::from("gc_content"), gc)),
        Column::from(Series::new(PlSmallStr::from("melting_temperature"), tm)),
        Column::from(Series::new(PlSmallStr::from("homopolymer_score"), homopolymer)),
        Column::from(Series::new(PlSmallStr::from("shannon_entropy"), entropy)),
        Column::from(Series::new(PlSmallStr::from("codon_bias"), codon_bias)),
        Column::from(Series::new(PlSmallStr::from("crossing_number"), crossings)),
        Column::from(Series::new(PlSmallStr::from("normalized_complexity"), complexity)),
        Column::from(Series::new(PlSmallStr::from("risk_level"), levels)),
        Column::from(Series::new(PlSmallStr::from("risk_score"), scores)),
        Column::from(Series::new(PlSmallStr::from("elevated_signals"), elevated)),
    ])
}

pub fn write_results_csv(df: &mut DataFrame, path: &Path) -> PolarsResult<()> {
    let mut file = File::create(path)
        .map_err(|e| PolarsError::ComputeError(format!("creating {}: {e}", path.display()).into()))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("results table saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::models::SequenceRecord;
    use crate::predictor::StructurePredictor;

    fn sample_results() -> Vec<SequenceAnalysisResult> {
        let predictor = StructurePredictor::new(AnalysisConfig::default()).unwrap();
        let records = vec![
            SequenceRecord::new("good-1", "ATGCATGCATGC"),
            SequenceRecord::new("bad-1", "ATGNNN"),
            SequenceRecord::new("good-2", "AAAAAAAAAA"),
        ];
        predictor.analyze_all(&records).collect()
    }

    #[test]
    fn summary_counts_and_failures() {
        let summary = summarize(&sample_results());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.analyzed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].id, "bad-1");
        assert!(summary.failures[0].reason.contains("'N'"));
        let counted: usize = summary.risk_distribution.iter().map(|b| b.count).sum();
        assert_eq!(counted, 2);
    }

    #[test]
    fn summary_serializes_to_json() {
        let summary = summarize(&sample_results());
        let json = serde_json::to_string_pretty(&summary).unwrap();
        assert!(json.contains("\"failures\""));
        assert!(json.contains("bad-1"));
    }

    #[test]
    fn dataframe_keeps_one_row_per_input() {
        let df = results_dataframe(&sample_results()).unwrap();
        assert_eq!(df.height(), 3);
        assert!(df.column("risk_level").is_ok());
        assert_eq!(df.column("gc_content").unwrap().null_count(), 1);
        assert_eq!(df.column("error").unwrap().null_count(), 2);
    }

    #[test]
    fn csv_round_trip_has_header_and_rows() {
        let mut df = results_dataframe(&sample_results()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        write_results_csv(&mut df, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,status"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn empty_run_summarizes_cleanly() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.means.gc_content, 0.0);
    }
}
