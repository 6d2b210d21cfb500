//! Injectable external collaborators.
//!
//! The neighbor-graph builder and the consensus builder are external
//! executables; the engine only depends on these one-operation traits so
//! tests can substitute in-process fakes.

pub mod matcher;
pub mod mock;

use crate::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A τ aimed at the matcher's exhaustive strategy; thresholds at or above
/// this value disable the k-mer candidate filter.
pub const EXHAUSTIVE_TAU: u32 = 9999;

/// Builds a τ-bounded neighbor file between two sequence files.
///
/// `queries` and `targets` are sequence files; the output follows the
/// neighbor-file format consumed by [`crate::matching::neighbor`]: one row
/// per query, 1-based target indices.
pub trait NeighborMatcher {
    fn run(&self, queries: &Path, targets: &Path, output: &Path, tau: u32) -> Result<()>;
}

/// Builds per-cluster consensus sequences from reads and an RCM.
pub trait ConsensusBuilder {
    fn run(&self, reads: &Path, rcm: &Path, output: &Path) -> Result<()>;
}

/// Cooperative cancellation flag shared with subprocess drivers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
