//! Read-to-cluster assignment by iterated bounded-distance matching.

use crate::bio::fasta::write_fasta;
use crate::bio::rcm::Rcm;
use crate::bio::{self, Sequence};
use crate::matching::BidirectionalMatch;
use crate::tools::{NeighborMatcher, EXHAUSTIVE_TAU};
use crate::utils::temp::TempFile;
use crate::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;
use tracing::info;

/// Default widening schedule of distance thresholds.
pub const DEFAULT_TAUS: [u32; 8] = [1, 2, 4, 8, 12, 16, 20, 24];

/// Result of a reconstruction run.
#[derive(Debug)]
pub struct ReconstructionOutcome {
    /// Assignments for every read that found a centroid. Reads that never
    /// matched are absent, i.e. unassigned.
    pub rcm: Rcm,
    /// Number of assignments decided by a random tie-break.
    pub uncertain: usize,
}

/// Assigns reads to the nearest centroid, widening the distance bound
/// round by round so cheap thresholds absorb the bulk of the reads first.
pub struct RcmReconstructor<'a> {
    matcher: &'a dyn NeighborMatcher,
    taus: Vec<u32>,
    rng: StdRng,
}

impl<'a> RcmReconstructor<'a> {
    /// `seed` fixes the tie-breaking RNG; runs with the same seed, inputs
    /// and schedule reproduce the same assignment.
    pub fn new(
        matcher: &'a dyn NeighborMatcher,
        taus: &[u32],
        exhaustive_fallback: bool,
        seed: u64,
    ) -> Self {
        let mut taus: Vec<u32> = taus.to_vec();
        taus.sort_unstable();
        taus.dedup();
        if exhaustive_fallback {
            taus.push(EXHAUSTIVE_TAU);
        }

        Self {
            matcher,
            taus,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn reconstruct(
        &mut self,
        reads_path: &Path,
        centroids_path: &Path,
    ) -> Result<ReconstructionOutcome> {
        let reads = bio::read_sequence_file(reads_path)?;
        let centroids = bio::read_sequence_file(centroids_path)?;
        self.reconstruct_in_memory(&reads, &centroids, centroids_path)
    }

    fn reconstruct_in_memory(
        &mut self,
        reads: &[Sequence],
        centroids: &[Sequence],
        centroids_path: &Path,
    ) -> Result<ReconstructionOutcome> {
        let cluster_names: Vec<String> = centroids
            .iter()
            .map(|c| c.cluster_mult().map_or_else(|| c.id.clone(), |(name, _)| name))
            .collect();

        let mut unassigned: Vec<bool> = vec![true; reads.len()];
        let mut rcm = Rcm::new();
        let mut uncertain = 0usize;

        for &tau in &self.taus {
            let pending: Vec<usize> = (0..reads.len()).filter(|&i| unassigned[i]).collect();
            if pending.is_empty() {
                break;
            }

            let tmp_reads = TempFile::new("repquast_unassigned", ".fa");
            let pending_records: Vec<Sequence> =
                pending.iter().map(|&i| reads[i].clone()).collect();
            write_fasta(tmp_reads.path(), &pending_records)?;
            info!("{} reads written for matching at tau = {}", pending.len(), tau);

            let matching = BidirectionalMatch::compute(
                self.matcher,
                centroids_path,
                tmp_reads.path(),
                tau,
            )?;

            for (row, &read_index) in pending.iter().enumerate() {
                let neighbors = &matching.rev[row];
                if neighbors.is_empty() {
                    continue;
                }

                let min_dist = neighbors
                    .iter()
                    .map(|&(_, d)| d)
                    .min()
                    .expect("non-empty neighbor list");
                let nearest: Vec<usize> = neighbors
                    .iter()
                    .filter(|&&(_, d)| d == min_dist)
                    .map(|&(c, _)| c)
                    .collect();

                if nearest.len() > 1 {
                    uncertain += 1;
                }
                let chosen = *nearest
                    .choose(&mut self.rng)
                    .expect("non-empty candidate list");

                rcm.insert(
                    reads[read_index].id.clone(),
                    Some(cluster_names[chosen].clone()),
                );
                unassigned[read_index] = false;
            }

            let left = unassigned.iter().filter(|&&u| u).count();
            info!("{} unmatched reads left after tau = {}", left, tau);
        }

        info!("{} uncertain assignments", uncertain);
        Ok(ReconstructionOutcome { rcm, uncertain })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::mock::NaiveMatcher;
    use pretty_assertions::assert_eq;

    fn write_fixture(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let reads_path = dir.join("reads.fa");
        let centroids_path = dir.join("centroids.fa");

        write_fasta(
            &reads_path,
            &[
                Sequence::new("near_a".to_string(), b"ACGTACGA".to_vec()),
                Sequence::new("exact_b".to_string(), b"TTTTTTTT".to_vec()),
                Sequence::new("far".to_string(), b"GGGGGGGG".to_vec()),
            ],
        )
        .unwrap();
        write_fasta(
            &centroids_path,
            &[
                Sequence::new("cluster___a___size___5".to_string(), b"ACGTACGT".to_vec()),
                Sequence::new("cluster___b___size___5".to_string(), b"TTTTTTTT".to_vec()),
            ],
        )
        .unwrap();

        (reads_path, centroids_path)
    }

    #[test]
    fn test_assignment_with_widening_taus() {
        let dir = tempfile::tempdir().unwrap();
        let (reads_path, centroids_path) = write_fixture(dir.path());

        let matcher = NaiveMatcher::new();
        let mut reconstructor = RcmReconstructor::new(&matcher, &[1, 2], false, 7);
        let outcome = reconstructor
            .reconstruct(&reads_path, &centroids_path)
            .unwrap();

        assert_eq!(outcome.rcm.get("near_a"), Some(&Some("a".to_string())));
        assert_eq!(outcome.rcm.get("exact_b"), Some(&Some("b".to_string())));
        // "far" is 6+ edits from everything and stays unassigned
        assert_eq!(outcome.rcm.get("far"), None);
        assert_eq!(outcome.uncertain, 0);
    }

    #[test]
    fn test_exhaustive_fallback_assigns_everything() {
        let dir = tempfile::tempdir().unwrap();
        let (reads_path, centroids_path) = write_fixture(dir.path());

        let matcher = NaiveMatcher::new();
        let mut reconstructor = RcmReconstructor::new(&matcher, &[1], true, 7);
        let outcome = reconstructor
            .reconstruct(&reads_path, &centroids_path)
            .unwrap();

        assert_eq!(outcome.rcm.len(), 3);
        assert!(outcome.rcm.get("far").is_some());
    }

    #[test]
    fn test_tie_breaking_is_seeded_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let reads_path = dir.path().join("reads.fa");
        let centroids_path = dir.path().join("centroids.fa");

        // equidistant from both centroids
        write_fasta(
            &reads_path,
            &[Sequence::new("torn".to_string(), b"AATT".to_vec())],
        )
        .unwrap();
        write_fasta(
            &centroids_path,
            &[
                Sequence::new("cluster___a___size___1".to_string(), b"AAAA".to_vec()),
                Sequence::new("cluster___b___size___1".to_string(), b"TTTT".to_vec()),
            ],
        )
        .unwrap();

        let matcher = NaiveMatcher::new();
        let run = |seed| {
            let mut r = RcmReconstructor::new(&matcher, &[2], false, seed);
            r.reconstruct(&reads_path, &centroids_path).unwrap()
        };

        let first = run(42);
        assert_eq!(first.uncertain, 1);
        let second = run(42);
        assert_eq!(first.rcm, second.rcm);
    }

    #[test]
    fn test_schedule_is_deduped_and_sorted() {
        let matcher = NaiveMatcher::new();
        let reconstructor = RcmReconstructor::new(&matcher, &[8, 1, 8, 2], true, 0);
        assert_eq!(reconstructor.taus, vec![1, 2, 8, EXHAUSTIVE_TAU]);
    }
}
