use crate::bio::fasta::write_fasta;
use crate::bio::Sequence;
use crate::stats::poisson;
use crate::Result;
use std::path::Path;

/// Positions ignored at the end of the consensus when counting mismatches.
pub const CUTAIL: usize = 0;

/// Fractional CDR intervals on the read, used to annotate the error
/// profile.
pub const CDR_INTERVALS: [(f64, f64); 3] = [(0.25, 0.30), (0.41, 0.54), (0.80, 0.86)];

const NUCLEOTIDES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Error profile of one cluster against its centroid.
///
/// The centroid is the externally declared sequence when one exists,
/// otherwise the majority consensus of the member reads.
#[derive(Debug, Clone)]
pub struct ClusterStats {
    pub name: String,
    pub declared_mult: Option<u64>,
    pub centroid: Vec<u8>,
    /// Shortest member read length; the profile length of the model.
    pub length: usize,
    /// Mismatches per centroid position, trimmed of trailing zeros.
    pub errors_by_position: Vec<u64>,
    /// Mismatch count per member read.
    pub errors_by_read: Vec<u64>,
    pub max_error: u64,
    reads: Vec<Sequence>,
}

impl ClusterStats {
    /// Compute the profile of a non-empty read set.
    pub fn compute(
        name: String,
        reads: Vec<Sequence>,
        center: Option<&Sequence>,
        declared_mult: Option<u64>,
    ) -> Self {
        assert!(!reads.is_empty(), "cluster {name} has no member reads");

        let length = reads.iter().map(Sequence::len).min().unwrap_or(0);
        let centroid = match center {
            Some(center) => center.sequence.clone(),
            None => consensus(&reads),
        };

        let window_end = centroid.len().saturating_sub(CUTAIL);
        let mut errors_by_position = vec![0u64; window_end];
        let mut errors_by_read = Vec::with_capacity(reads.len());

        for read in &reads {
            let mut read_errors = 0u64;
            for i in 0..read.len().min(window_end) {
                if read.sequence[i] != centroid[i] {
                    errors_by_position[i] += 1;
                    read_errors += 1;
                }
            }
            errors_by_read.push(read_errors);
        }

        while errors_by_position.last() == Some(&0) {
            errors_by_position.pop();
        }
        let max_error = errors_by_position.iter().copied().max().unwrap_or(0);

        Self {
            name,
            declared_mult,
            centroid,
            length,
            errors_by_position,
            errors_by_read,
            max_error,
            reads,
        }
    }

    /// Number of member reads.
    pub fn size(&self) -> usize {
        self.reads.len()
    }

    /// Total mismatch count across the profile.
    pub fn nerrors(&self) -> u64 {
        self.errors_by_position.iter().sum()
    }

    /// Error positions normalized to [0, 1), one entry per observed error.
    /// This is the data series behind the error-profile rendering.
    pub fn error_positions01(&self) -> Vec<f64> {
        let l = self.length as f64;
        let mut positions = Vec::new();
        for (i, &count) in self.errors_by_position.iter().enumerate() {
            for _ in 0..count {
                positions.push(i as f64 / l);
            }
        }
        positions
    }

    fn position_rate(&self, error_rate: f64) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        error_rate / self.length as f64 * self.size() as f64
    }

    /// CDF of the maximum per-position error count under the null model
    /// with repertoire-level per-read error rate `error_rate`.
    pub fn max_cdf(&self, x: i64, error_rate: f64) -> f64 {
        if self.length == 0 {
            return 1.0;
        }
        poisson::max_cdf(x, self.position_rate(error_rate), self.length as u64)
    }

    /// Quantile of the maximum per-position error count. Not consumed by
    /// any downstream metric; kept as a public query.
    pub fn max_ppf(&self, q: f64, error_rate: f64) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        poisson::max_quantile(q, self.position_rate(error_rate), self.length as u64)
    }

    /// Probability of a maximum at least as large as observed.
    pub fn pvalue_upper(&self, error_rate: f64) -> f64 {
        1.0 - self.max_cdf(self.max_error as i64 - 1, error_rate)
    }

    /// Probability of a maximum no larger than observed.
    pub fn pvalue_lower(&self, error_rate: f64) -> f64 {
        self.max_cdf(self.max_error as i64, error_rate)
    }

    pub fn pvalue_both(&self, error_rate: f64) -> f64 {
        2.0 * self
            .pvalue_upper(error_rate)
            .min(self.pvalue_lower(error_rate))
    }

    /// Write the member reads as FASTA (gzipped when the path ends `.gz`).
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_fasta(path, &self.reads)
    }
}

/// Majority nucleotide per position over the first `min(len)` positions.
/// Ties break in A < C < G < T order; non-ACGT bases never win a column.
pub fn consensus(reads: &[Sequence]) -> Vec<u8> {
    let length = reads.iter().map(Sequence::len).min().unwrap_or(0);

    let mut counts = vec![[0u64; 4]; length];
    for read in reads {
        for i in 0..length.min(read.len()) {
            if let Some(idx) = NUCLEOTIDES.iter().position(|&n| n == read.sequence[i]) {
                counts[i][idx] += 1;
            }
        }
    }

    counts
        .iter()
        .map(|column| {
            // first maximum wins, which is the A < C < G < T tie order
            let mut best = 0;
            for idx in 1..NUCLEOTIDES.len() {
                if column[idx] > column[best] {
                    best = idx;
                }
            }
            NUCLEOTIDES[best]
        })
        .collect()
}
