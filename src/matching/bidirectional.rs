use crate::bio;
use crate::matching::neighbor::NeighborIndex;
use crate::tools::NeighborMatcher;
use crate::utils::temp::TempFile;
use crate::{RepquastError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Merged bidirectional neighbor relation between a constructed and a
/// reference repertoire.
///
/// Edges are the union of both matcher orientations; when an edge appears
/// in both, the smaller distance wins. `fwd` maps constructed cluster
/// indices to `(reference, distance)` pairs and `rev` is its transpose, so
/// the relation is symmetric by construction.
#[derive(Debug, Clone)]
pub struct BidirectionalMatch {
    pub fwd: Vec<Vec<(usize, u32)>>,
    pub rev: Vec<Vec<(usize, u32)>>,
    pub constructed_abundances: Vec<u64>,
    pub reference_abundances: Vec<u64>,
}

impl BidirectionalMatch {
    /// Run the external matcher in both orientations and merge the results.
    pub fn compute(
        matcher: &dyn NeighborMatcher,
        constructed: &Path,
        reference: &Path,
        tau_max: u32,
    ) -> Result<Self> {
        let reference_abundances = bio::cluster_sizes(reference)?;
        let n_reference = reference_abundances.len();

        let output = TempFile::new("repquast_match", ".graph");

        matcher.run(constructed, reference, output.path(), tau_max)?;
        let cons_to_ref =
            NeighborIndex::parse_file(output.path(), n_reference, tau_max)?;
        let n_constructed = cons_to_ref.fwd.len();

        matcher.run(reference, constructed, output.path(), tau_max)?;
        let ref_to_cons =
            NeighborIndex::parse_file(output.path(), n_constructed, tau_max)?;
        if ref_to_cons.fwd.len() != n_reference {
            return Err(RepquastError::InvariantViolated(format!(
                "matcher reported {} reference clusters, centroid file has {}",
                ref_to_cons.fwd.len(),
                n_reference
            )));
        }

        let mut edges: HashMap<(usize, usize), u32> = HashMap::new();
        for (i, neighbors) in cons_to_ref.fwd.iter().enumerate() {
            for &(j, d) in neighbors {
                merge_min(&mut edges, (i, j), d);
            }
        }
        for (j, neighbors) in ref_to_cons.fwd.iter().enumerate() {
            for &(i, d) in neighbors {
                merge_min(&mut edges, (i, j), d);
            }
        }

        let mut fwd = vec![Vec::new(); n_constructed];
        let mut rev = vec![Vec::new(); n_reference];
        for (&(i, j), &d) in &edges {
            fwd[i].push((j, d));
            rev[j].push((i, d));
        }
        // edge iteration order is arbitrary; fix it for reproducible output
        for neighbors in fwd.iter_mut().chain(rev.iter_mut()) {
            neighbors.sort_unstable();
        }

        Ok(Self {
            fwd,
            rev,
            constructed_abundances: cons_to_ref.query_abundances,
            reference_abundances,
        })
    }

    /// Build a relation directly from forward adjacency; used by tests and
    /// by callers that already hold a merged edge set.
    pub fn from_parts(
        fwd: Vec<Vec<(usize, u32)>>,
        constructed_abundances: Vec<u64>,
        reference_abundances: Vec<u64>,
    ) -> Self {
        let mut rev = vec![Vec::new(); reference_abundances.len()];
        for (i, neighbors) in fwd.iter().enumerate() {
            for &(j, d) in neighbors {
                rev[j].push((i, d));
            }
        }
        for neighbors in rev.iter_mut() {
            neighbors.sort_unstable();
        }
        Self {
            fwd,
            rev,
            constructed_abundances,
            reference_abundances,
        }
    }

    /// Diagnostic: clusters matched at distance 0 to more than one partner.
    ///
    /// Duplicate exact matches usually mean duplicated centroids on one
    /// side. This is logged, never an error.
    pub fn check(&self) -> ZeroDistanceDuplicates {
        let constructed = multi_zero_matches(&self.fwd);
        for (i, partners) in &constructed {
            info!(
                "constructed cluster {} matched at distance 0 to several references: {:?}",
                i, partners
            );
        }

        let reference = multi_zero_matches(&self.rev);
        for (j, partners) in &reference {
            info!(
                "reference cluster {} matched at distance 0 to several constructed: {:?}",
                j, partners
            );
        }

        ZeroDistanceDuplicates {
            constructed,
            reference,
        }
    }
}

/// Offending index sets reported by [`BidirectionalMatch::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZeroDistanceDuplicates {
    pub constructed: Vec<(usize, Vec<usize>)>,
    pub reference: Vec<(usize, Vec<usize>)>,
}

fn merge_min(edges: &mut HashMap<(usize, usize), u32>, key: (usize, usize), d: u32) {
    edges
        .entry(key)
        .and_modify(|existing| *existing = (*existing).min(d))
        .or_insert(d);
}

fn multi_zero_matches(adjacency: &[Vec<(usize, u32)>]) -> Vec<(usize, Vec<usize>)> {
    adjacency
        .iter()
        .enumerate()
        .filter_map(|(i, neighbors)| {
            let exact: Vec<usize> = neighbors
                .iter()
                .filter(|&&(_, d)| d == 0)
                .map(|&(j, _)| j)
                .collect();
            (exact.len() > 1).then_some((i, exact))
        })
        .collect()
}
