use std::env;
use std::fs::create_dir_all;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::analysis::{charts, report};
use crate::config::AnalysisConfig;
use crate::data_handling::fasta::{find_fasta_file, FastaFile};
use crate::data_handling::SequenceSource;
use crate::predictor::StructurePredictor;

mod analysis;
mod config;
mod data_handling;
mod metrics;
mod models;
mod predictor;
mod risk;
mod topology;

const OUTPUT_DIR: &str = "./results";

fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting the DNA structural-risk pipeline");

    // Resolve the input: first CLI argument, or auto-detected FASTA file
    let fasta_path = match env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => find_fasta_file()?,
    };
    info!("Processing: {}", fasta_path.display());

    let output_dir = PathBuf::from(OUTPUT_DIR);
    create_dir_all(&output_dir)?;

    // A malformed configuration aborts here, before any sequence is read;
    // it would silently mis-classify every sequence otherwise.
    let config = AnalysisConfig::default();
    config.write_run_config(&output_dir)?;
    let predictor = StructurePredictor::new(config)?;

    // Load records; content validation happens per sequence downstream
    let records = FastaFile { path: fasta_path }.load()?;
    info!("Loaded {} sequence records", records.len());

    // Run the per-sequence pipeline (single pass over the lazy stream)
    let results: Vec<_> = predictor.analyze_all(&records).collect();

    // Summarize, persist and plot
    let summary = report::summarize(&results);
    report::log_summary(&summary);
    report::write_summary_json(&summary, &output_dir)?;

    let mut df = report::results_dataframe(&results)?;
    report::write_results_csv(&mut df, &output_dir.join("results.csv"))?;

    charts::render_all(&results, predictor.classifier().config(), &output_dir)?;

    info!("Analysis complete; results saved to {}", output_dir.display());
    Ok(())
}
