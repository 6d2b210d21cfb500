//! Sequence records and on-disk formats (FASTA/FASTQ/RCM).

pub mod fasta;
pub mod fastq;
pub mod rcm;
pub mod sequence;

pub use sequence::Sequence;

use crate::{RepquastError, Result};
use std::path::Path;

/// Read a sequence file, dispatching on extension (`.fa`/`.fasta` vs
/// `.fq`/`.fastq`, optionally `.gz`-suffixed).
pub fn read_sequence_file<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    let path = path.as_ref();

    let stem = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Path::new(path.file_stem().unwrap_or_default())
    } else {
        path
    };

    match stem.extension().and_then(|e| e.to_str()) {
        Some("fq") | Some("fastq") => fastq::read_fastq(path),
        Some("fa") | Some("fasta") | Some("fna") => fasta::read_fasta(path),
        _ => Err(RepquastError::MalformedInput(format!(
            "cannot infer sequence format from file name: {}",
            path.display()
        ))),
    }
}

/// Declared multiplicities of every cluster record in a centroid file.
pub fn cluster_sizes<P: AsRef<Path>>(path: P) -> Result<Vec<u64>> {
    let records = read_sequence_file(path)?;
    Ok(records.iter().map(Sequence::multiplicity).collect())
}
