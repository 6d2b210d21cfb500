use serde::{Deserialize, Serialize};
use std::fmt;

/// A single sequence record: identifier, optional free-text description and
/// the nucleotide string itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub sequence: Vec<u8>,
}

impl Sequence {
    pub fn new(id: String, sequence: Vec<u8>) -> Self {
        Self {
            id,
            description: None,
            sequence,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// FASTA header line for this record (without trailing newline).
    pub fn header(&self) -> String {
        match &self.description {
            Some(desc) => format!(">{} {}", self.id, desc),
            None => format!(">{}", self.id),
        }
    }

    /// Cluster name and declared size parsed from the identifier, if the
    /// identifier follows the centroid naming convention.
    pub fn cluster_mult(&self) -> Option<(String, u64)> {
        parse_cluster_mult(&self.id)
    }

    /// Declared multiplicity; 1 for records without a parsable size field.
    pub fn multiplicity(&self) -> u64 {
        self.cluster_mult().map_or(1, |(_, mult)| mult)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.sequence))
    }
}

/// Parse a centroid identifier of the form `cluster___<name>___size___<int>`.
///
/// Headers lacking the size suffix yield multiplicity 1. Identifiers that do
/// not start with the `cluster___` token are not centroid headers and yield
/// `None`.
pub fn parse_cluster_mult(id: &str) -> Option<(String, u64)> {
    let rest = id.strip_prefix("cluster___")?;

    if let Some((name, size)) = rest.rsplit_once("___size___") {
        if let Ok(mult) = size.trim().parse::<u64>() {
            return Some((name.to_string(), mult));
        }
    }

    Some((rest.to_string(), 1))
}
