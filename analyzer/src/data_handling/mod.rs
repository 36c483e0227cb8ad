use anyhow::Result;

use crate::models::SequenceRecord;

pub mod fasta;

/// A source of input sequences. The pipeline core never touches files
/// itself; it consumes whatever records a source hands it.
pub trait SequenceSource {
    fn load(&self) -> Result<Vec<SequenceRecord>>;
}
