//! Figure rendering for a finished run: risk distribution, metric
//! distributions and codon usage, with the configured decision boundaries
//! drawn into each chart.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use log::{info, warn};
use plotters::prelude::*;

use crate::config::AnalysisConfig;
use crate::models::{AnalysisOutcome, RiskLevel, SequenceAnalysisResult};

const CAPTION_FONT: (&str, i32) = ("sans-serif bold", 26);
const AXIS_FONT: (&str, i32) = ("sans-serif", 22);
const LABEL_FONT: (&str, i32) = ("sans-serif", 18);

fn colour_for_level(level: RiskLevel) -> RGBColor {
    match level {
        RiskLevel::Low => RGBColor(34, 139, 34),
        RiskLevel::Medium => RGBColor(255, 165, 0),
        RiskLevel::High => RGBColor(255, 69, 0),
        RiskLevel::Critical => RGBColor(178, 34, 34),
    }
}

/// The analyzed subset of a run, flattened for plotting.
struct PlotPoint {
    gc: f64,
    tm: f64,
    entropy: f64,
    complexity: f64,
    level: RiskLevel,
}

pub fn render_all(
    results: &[SequenceAnalysisResult],
    config: &AnalysisConfig,
    output_dir: &Path,
) -> Result<()> {
    let points: Vec<PlotPoint> = results
        .iter()
        .filter_map(|r| match &r.outcome {
            AnalysisOutcome::Analyzed { metrics, topology, risk } => Some(PlotPoint {
                gc: metrics.gc_content,
                tm: metrics.melting_temperature,
                entropy: metrics.shannon_entropy,
                complexity: topology.normalized_complexity,
                level: risk.level,
            }),
            AnalysisOutcome::Failed { .. } => None,
        })
        .collect();

    if points.is_empty() {
        warn!("no analyzed sequences; skipping charts");
        return Ok(());
    }

    risk_distribution_chart(&points, &output_dir.join("risk_distribution.png"))?;
    gc_vs_complexity_chart(&points, config, &output_dir.join("gc_vs_complexity.png"))?;
    tm_histogram(&points, config, &output_dir.join("tm_distribution.png"))?;
    entropy_histogram(&points, config, &output_dir.join("entropy_distribution.png"))?;
    codon_usage_chart(results, &output_dir.join("codon_usage.png"))?;
    Ok(())
}

fn risk_distribution_chart(points: &[PlotPoint], output_path: &Path) -> Result<()> {
    let mut counts = [0usize; 4];
    for p in points {
        counts[p.level as usize] += 1;
    }
    let y_max = counts.iter().copied().max().unwrap_or(1).max(1) as f64 * 1.2;

    let root = BitMapBackend::new(output_path, (900, 650)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("risk chart: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Risk Level Distribution", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..4.0, 0.0..y_max)
        .map_err(|e| anyhow!("risk chart: {e}"))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .x_desc("Risk level")
        .y_desc("Sequences")
        .axis_desc_style(AXIS_FONT)
        .label_style(LABEL_FONT)
        .draw()
        .map_err(|e| anyhow!("risk chart: {e}"))?;

    for (i, level) in RiskLevel::ALL.iter().enumerate() {
        let colour = colour_for_level(*level);
        let count = counts[i] as f64;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(i as f64 + 0.18, 0.0), (i as f64 + 0.82, count)],
                colour.filled(),
            )))
            .map_err(|e| anyhow!("risk chart: {e}"))?
            .label(format!("{level} ({})", counts[i]))
            .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], colour.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(LABEL_FONT)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(|e| anyhow!("risk chart: {e}"))?;

    root.present().map_err(|e| anyhow!("risk chart: {e}"))?;
    info!("saved {}", output_path.display());
    Ok(())
}

fn gc_vs_complexity_chart(
    points: &[PlotPoint],
    config: &AnalysisConfig,
    output_path: &Path,
) -> Result<()> {
    let root = BitMapBackend::new(output_path, (900, 650)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("gc chart: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("GC Content vs Topological Complexity", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)
        .map_err(|e| anyhow!("gc chart: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("GC content")
        .y_desc("Normalized complexity")
        .axis_desc_style(AXIS_FONT)
        .label_style(LABEL_FONT)
        .draw()
        .map_err(|e| anyhow!("gc chart: {e}"))?;

    chart
        .draw_series(
            points
                .iter()
                .map(|p| Circle::new((p.gc, p.complexity), 5, colour_for_level(p.level).filled())),
        )
        .map_err(|e| anyhow!("gc chart: {e}"))?;

    // Decision boundaries: the acceptable GC band and the complexity
    // threshold.
    for x in [config.gc_band.lower, config.gc_band.upper] {
        chart
            .draw_series(LineSeries::new(
                vec![(x, 0.0), (x, 1.0)],
                BLACK.mix(0.4).stroke_width(2),
            ))
            .map_err(|e| anyhow!("gc chart: {e}"))?;
    }
    chart
        .draw_series(LineSeries::new(
            vec![(0.0, config.topology_threshold), (1.0, config.topology_threshold)],
            RED.mix(0.4).stroke_width(2),
        ))
        .map_err(|e| anyhow!("gc chart: {e}"))?;

    root.present().map_err(|e| anyhow!("gc chart: {e}"))?;
    info!("saved {}", output_path.display());
    Ok(())
}

fn tm_histogram(points: &[PlotPoint], config: &AnalysisConfig, output_path: &Path) -> Result<()> {
    let values: Vec<f64> = points.iter().map(|p| p.tm).collect();
    let lo = values
        .iter()
        .cloned()
        .fold(config.tm_band.lower, f64::min)
        .floor()
        - 5.0;
    let hi = values
        .iter()
        .cloned()
        .fold(config.tm_band.upper, f64::max)
        .ceil()
        + 5.0;
    let bins = histogram_bins(&values, lo, hi, 12);
    let y_max = bins.iter().map(|&(_, _, c)| c).max().unwrap_or(1).max(1) as f64 * 1.2;

    let root = BitMapBackend::new(output_path, (900, 650)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("tm chart: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Melting Temperature Distribution", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, 0.0..y_max)
        .map_err(|e| anyhow!("tm chart: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("Tm (°C)")
        .y_desc("Sequences")
        .axis_desc_style(AXIS_FONT)
        .label_style(LABEL_FONT)
        .draw()
        .map_err(|e| anyhow!("tm chart: {e}"))?;

    chart
        .draw_series(bins.iter().map(|&(x0, x1, count)| {
            Rectangle::new([(x0, 0.0), (x1, count as f64)], RGBColor(230, 126, 34).filled())
        }))
        .map_err(|e| anyhow!("tm chart: {e}"))?;

    for x in [config.tm_band.lower, config.tm_band.upper] {
        chart
            .draw_series(LineSeries::new(
                vec![(x, 0.0), (x, y_max)],
                RED.mix(0.5).stroke_width(2),
            ))
            .map_err(|e| anyhow!("tm chart: {e}"))?;
    }

    root.present().map_err(|e| anyhow!("tm chart: {e}"))?;
    info!("saved {}", output_path.display());
    Ok(())
}

fn entropy_histogram(
    points: &[PlotPoint],
    config: &AnalysisConfig,
    output_path: &Path,
) -> Result<()> {
    let values: Vec<f64> = points.iter().map(|p| p.entropy).collect();
    let bins = histogram_bins(&values, 0.0, 2.0, 15);
    let y_max = bins.iter().map(|&(_, _, c)| c).max().unwrap_or(1).max(1) as f64 * 1.2;

    let root = BitMapBackend::new(output_path, (900, 650)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("entropy chart: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Shannon Entropy Distribution", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..2.05, 0.0..y_max)
        .map_err(|e| anyhow!("entropy chart: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("Entropy (bits)")
        .y_desc("Sequences")
        .axis_desc_style(AXIS_FONT)
        .label_style(LABEL_FONT)
        .draw()
        .map_err(|e| anyhow!("entropy chart: {e}"))?;

    chart
        .draw_series(bins.iter().map(|&(x0, x1, count)| {
            Rectangle::new([(x0, 0.0), (x1, count as f64)], RGBColor(22, 160, 133).filled())
        }))
        .map_err(|e| anyhow!("entropy chart: {e}"))?;

    chart
        .draw_series(LineSeries::new(
            vec![(config.entropy_threshold, 0.0), (config.entropy_threshold, y_max)],
            RED.mix(0.5).stroke_width(2),
        ))
        .map_err(|e| anyhow!("entropy chart: {e}"))?;

    root.present().map_err(|e| anyhow!("entropy chart: {e}"))?;
    info!("saved {}", output_path.display());
    Ok(())
}

fn codon_usage_chart(results: &[SequenceAnalysisResult], output_path: &Path) -> Result<()> {
    let top = top_codons(results, 12);
    if top.is_empty() {
        warn!("no codon data; skipping codon usage chart");
        return Ok(());
    }
    let y_max = top.iter().map(|&(_, f)| f).fold(0.0, f64::max) * 1.3;

    let root = BitMapBackend::new(output_path, (900, 650)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("codon chart: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Top Codon Usage", CAPTION_FONT)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..top.len() as f64, 0.0..y_max)
        .map_err(|e| anyhow!("codon chart: {e}"))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .x_desc("Codon")
        .y_desc("Mean observed frequency")
        .axis_desc_style(AXIS_FONT)
        .label_style(LABEL_FONT)
        .draw()
        .map_err(|e| anyhow!("codon chart: {e}"))?;

    chart
        .draw_series(top.iter().enumerate().map(|(i, &(_, freq))| {
            Rectangle::new(
                [(i as f64 + 0.15, 0.0), (i as f64 + 0.85, freq)],
                RGBColor(52, 152, 219).filled(),
            )
        }))
        .map_err(|e| anyhow!("codon chart: {e}"))?;

    chart
        .draw_series(top.iter().enumerate().map(|(i, (codon, freq))| {
            Text::new(codon.clone(), (i as f64 + 0.25, freq + y_max * 0.03), ("sans-serif", 16))
        }))
        .map_err(|e| anyhow!("codon chart: {e}"))?;

    root.present().map_err(|e| anyhow!("codon chart: {e}"))?;
    info!("saved {}", output_path.display());
    Ok(())
}

/// Fixed-width bins over [lo, hi]; values outside fall into the edge bins.
fn histogram_bins(values: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<(f64, f64, usize)> {
    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, c))
        .collect()
}

/// Mean observed frequency per codon over analyzed sequences, highest first.
fn top_codons(results: &[SequenceAnalysisResult], limit: usize) -> Vec<(String, f64)> {
    let mut sums: HashMap<String, f64> = HashMap::new();
    let mut analyzed = 0usize;
    for result in results {
        if let AnalysisOutcome::Analyzed { metrics, .. } = &result.outcome {
            analyzed += 1;
            for (codon, freq) in &metrics.codon_frequencies {
                *sums.entry(codon.clone()).or_insert(0.0) += freq;
            }
        }
    }
    if analyzed == 0 {
        return Vec::new();
    }
    let mut means: Vec<(String, f64)> = sums
        .into_iter()
        .map(|(codon, sum)| (codon, sum / analyzed as f64))
        .collect();
    means.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
    means.truncate(limit);
    means
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::models::SequenceRecord;
    use crate::predictor::StructurePredictor;

    #[test]
    fn histogram_covers_all_values() {
        let values = [0.0, 0.5, 1.0, 1.99, 2.0];
        let bins = histogram_bins(&values, 0.0, 2.0, 4);
        assert_eq!(bins.len(), 4);
        let total: usize = bins.iter().map(|&(_, _, c)| c).sum();
        assert_eq!(total, values.len());
        // Values at and past the upper bound land in the last bin.
        assert_eq!(bins[3].2, 2);
    }

    #[test]
    fn top_codons_ranks_by_mean_frequency() {
        let predictor = StructurePredictor::new(AnalysisConfig::default()).unwrap();
        let records = vec![
            SequenceRecord::new("a", "AAAAAATTT"),
            SequenceRecord::new("b", "AAAGGG"),
            SequenceRecord::new("bad", "NNN"),
        ];
        let results: Vec<_> = predictor.analyze_all(&records).collect();
        let top = top_codons(&results, 12);
        assert_eq!(top[0].0, "AAA");
        assert!(top.iter().all(|(_, f)| *f <= 1.0));
    }

    #[test]
    fn top_codons_is_empty_without_analyzed_results() {
        let top = top_codons(&[], 12);
        assert!(top.is_empty());
    }
}
