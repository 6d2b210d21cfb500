//! In-process matcher for tests and small inputs.

use crate::bio;
use crate::tools::{NeighborMatcher, EXHAUSTIVE_TAU};
use crate::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Exact Levenshtein matcher that emits the neighbor-file format the real
/// tool produces. Quadratic in input sizes; meant for tests and fixtures,
/// not production repertoires.
#[derive(Debug, Default)]
pub struct NaiveMatcher;

impl NaiveMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl NeighborMatcher for NaiveMatcher {
    fn run(&self, queries: &Path, targets: &Path, output: &Path, tau: u32) -> Result<()> {
        let queries = bio::read_sequence_file(queries)?;
        let targets = bio::read_sequence_file(targets)?;

        let unbounded = tau >= EXHAUSTIVE_TAU;

        let mut body = String::new();
        let mut edges = 0usize;
        for query in &queries {
            write!(body, "{}", query.multiplicity()).expect("write to String");
            for (j, target) in targets.iter().enumerate() {
                let d = levenshtein(&query.sequence, &target.sequence);
                if unbounded || d <= tau as usize {
                    // target indices are 1-based on the wire
                    write!(body, " {} {}", j + 1, d).expect("write to String");
                    edges += 1;
                }
            }
            body.push('\n');
        }

        let header = format!("{} {} 1\n", queries.len(), edges);
        std::fs::write(output, header + &body)?;
        Ok(())
    }
}

/// Plain dynamic-programming edit distance.
pub fn levenshtein(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() {
        return b.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut prev = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitute = prev + usize::from(ca != cb);
            prev = row[j + 1];
            row[j + 1] = substitute.min(prev + 1).min(row[j] + 1);
        }
    }
    row[b.len()]
}
