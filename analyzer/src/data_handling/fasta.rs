//! Multi-record FASTA ingestion.
//!
//! Parsing is lenient about sequence content: records are normalized
//! (uppercased, whitespace stripped) but not validated here, so a malformed
//! record still reaches the predictor and comes back as an error-tagged
//! result instead of killing the run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::data_handling::SequenceSource;
use crate::models::SequenceRecord;

const FASTA_EXTENSIONS: [&str; 3] = ["fasta", "fa", "fna"];

pub struct FastaFile {
    pub path: PathBuf,
}

impl SequenceSource for FastaFile {
    fn load(&self) -> Result<Vec<SequenceRecord>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading FASTA file {}", self.path.display()))?;

        let mut records = Vec::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('>') {
                if let Some((id, seq)) = current.take() {
                    records.push(SequenceRecord::new(id, seq));
                }
                let id = header.split_whitespace().next().unwrap_or("").to_string();
                current = Some((id, String::new()));
            } else if let Some((_, seq)) = current.as_mut() {
                seq.push_str(line);
            } else {
                warn!("ignoring sequence data before the first FASTA header");
            }
        }
        if let Some((id, seq)) = current {
            records.push(SequenceRecord::new(id, seq));
        }

        if records.is_empty() {
            warn!("no records found in {}", self.path.display());
        } else {
            info!("loaded {} records from {}", records.len(), self.path.display());
        }
        Ok(records)
    }
}

/// Look for a FASTA file in the working directory and `./data` when no
/// input path was given on the command line.
pub fn find_fasta_file() -> Result<PathBuf> {
    for dir in [Path::new("."), Path::new("data")] {
        if !dir.is_dir() {
            continue;
        }
        let mut matches: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("listing {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| FASTA_EXTENSIONS.contains(&e))
                    .unwrap_or(false)
            })
            .collect();
        matches.sort();
        if let Some(found) = matches.into_iter().next() {
            info!("found FASTA file: {}", found.display());
            return Ok(found);
        }
    }
    bail!("no FASTA file found; place a .fasta, .fa or .fna file here or in ./data")
}
