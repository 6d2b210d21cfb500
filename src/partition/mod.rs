//! Agreement between two read clusterings over the same id universe.

use crate::bio::rcm::{self, Rcm};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// Contingency-based similarity indices between two labelings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityIndices {
    pub jaccard_index: f64,
    pub fowlkes_mallows_index: f64,
    pub rand_index: f64,
    pub adjusted_rand_index: f64,
    pub reference_purity: f64,
    pub constructed_purity: f64,
    pub normalized_mutual_information: f64,
}

/// Two labelings of the same reads, with derived agreement statistics.
///
/// Side X is the constructed clustering, side Y the reference one.
/// Unassigned reads are kept as explicit ⊥ labels and renamed to per-side,
/// per-read sentinels before any index computation, so two unassigned reads
/// never count as co-clustered.
pub struct PartitionCompare {
    labels_x: Vec<Option<String>>,
    labels_y: Vec<Option<String>>,
    sizes_x: IndexMap<String, usize>,
    sizes_y: IndexMap<String, usize>,
    cache: Cache,
}

#[derive(Default)]
struct Cache {
    indices: Option<SimilarityIndices>,
    votes_x: Option<Vec<Vec<u64>>>,
    votes_y: Option<Vec<Vec<u64>>>,
}

impl PartitionCompare {
    /// Compare two RCMs. The id universe is the union of both key sets;
    /// reads missing from one side are unassigned on that side. Cluster
    /// sizes used by [`prune`](Self::prune) are the pre-pruning sizes.
    pub fn from_rcms(constructed: &Rcm, reference: &Rcm) -> Self {
        let mut ids: Vec<&String> = constructed.keys().collect();
        ids.extend(reference.keys().filter(|id| !constructed.contains_key(*id)));

        let labels_x = ids
            .iter()
            .map(|id| constructed.get(*id).cloned().flatten())
            .collect();
        let labels_y = ids
            .iter()
            .map(|id| reference.get(*id).cloned().flatten())
            .collect();

        Self::new_with_sizes(
            labels_x,
            labels_y,
            rcm::cluster_sizes(constructed),
            rcm::cluster_sizes(reference),
        )
    }

    /// Compare two equal-length label vectors directly.
    pub fn new(labels_x: Vec<Option<String>>, labels_y: Vec<Option<String>>) -> Self {
        let sizes_x = count_labels(&labels_x);
        let sizes_y = count_labels(&labels_y);
        Self::new_with_sizes(labels_x, labels_y, sizes_x, sizes_y)
    }

    fn new_with_sizes(
        labels_x: Vec<Option<String>>,
        labels_y: Vec<Option<String>>,
        sizes_x: IndexMap<String, usize>,
        sizes_y: IndexMap<String, usize>,
    ) -> Self {
        assert_eq!(
            labels_x.len(),
            labels_y.len(),
            "label vectors cover different id universes"
        );
        Self {
            labels_x,
            labels_y,
            sizes_x,
            sizes_y,
            cache: Cache::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels_x.is_empty()
    }

    /// Mask to ⊥ every label whose (pre-pruning) cluster size is below the
    /// per-side threshold. Cached derivations are invalidated.
    pub fn prune(&mut self, size_x: usize, size_y: usize) {
        for label in self.labels_x.iter_mut() {
            if label
                .as_ref()
                .map_or(0, |c| self.sizes_x.get(c).copied().unwrap_or(0))
                < size_x
            {
                *label = None;
            }
        }
        for label in self.labels_y.iter_mut() {
            if label
                .as_ref()
                .map_or(0, |c| self.sizes_y.get(c).copied().unwrap_or(0))
                < size_y
            {
                *label = None;
            }
        }
        self.cache = Cache::default();
    }

    /// All contingency-based indices, computed lazily and cached until the
    /// next [`prune`](Self::prune).
    ///
    /// Requires at least two reads; pair counts are undefined below that.
    pub fn indices(&mut self) -> &SimilarityIndices {
        if self.cache.indices.is_none() {
            let x = rename_unassigned(&self.labels_x, "x");
            let y = rename_unassigned(&self.labels_y, "y");
            let mut indices = similarity_indices(&x, &y);
            indices.constructed_purity = purity(&x, &y);
            indices.reference_purity = purity(&y, &x);
            self.cache.indices = Some(indices);
        }
        self.cache.indices.as_ref().expect("cache populated above")
    }

    /// Per-cluster vote vectors for one side: for each cluster of that
    /// side, the descending counts of partner labels among its reads,
    /// zero-padded to length ≥ 2. Pairs with a ⊥ on either side are
    /// skipped.
    pub fn votes(&mut self, constructed: bool) -> &[Vec<u64>] {
        let missing = if constructed {
            self.cache.votes_x.is_none()
        } else {
            self.cache.votes_y.is_none()
        };
        if missing {
            let computed = if constructed {
                votes(&self.labels_x, &self.labels_y)
            } else {
                votes(&self.labels_y, &self.labels_x)
            };
            if constructed {
                self.cache.votes_x = Some(computed);
            } else {
                self.cache.votes_y = Some(computed);
            }
        }
        let slot = if constructed {
            &self.cache.votes_x
        } else {
            &self.cache.votes_y
        };
        slot.as_ref().expect("cache populated above")
    }
}

fn count_labels(labels: &[Option<String>]) -> IndexMap<String, usize> {
    let mut sizes = IndexMap::new();
    for label in labels.iter().flatten() {
        *sizes.entry(label.clone()).or_insert(0) += 1;
    }
    sizes
}

/// Replace ⊥ with a per-side, per-position sentinel so unassigned reads
/// form singletons.
fn rename_unassigned(labels: &[Option<String>], side: &str) -> Vec<String> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| match label {
            Some(name) => name.clone(),
            None => format!("__none__{side}__{i}"),
        })
        .collect()
}

fn comb2(n: u64) -> u64 {
    n * (n.saturating_sub(1)) / 2
}

fn similarity_indices(x: &[String], y: &[String]) -> SimilarityIndices {
    assert_eq!(x.len(), y.len());
    let n = x.len() as u64;
    assert!(n >= 2, "similarity indices need at least two reads");

    let mut cells: HashMap<(&str, &str), u64> = HashMap::new();
    let mut marginal_x: HashMap<&str, u64> = HashMap::new();
    let mut marginal_y: HashMap<&str, u64> = HashMap::new();
    for (a, b) in x.iter().zip(y) {
        *cells.entry((a.as_str(), b.as_str())).or_insert(0) += 1;
        *marginal_x.entry(a.as_str()).or_insert(0) += 1;
        *marginal_y.entry(b.as_str()).or_insert(0) += 1;
    }

    let s00: u64 = cells.values().map(|&m| comb2(m)).sum();
    let sum_comb_x: u64 = marginal_x.values().map(|&m| comb2(m)).sum();
    let sum_comb_y: u64 = marginal_y.values().map(|&m| comb2(m)).sum();
    let s01 = sum_comb_x - s00;
    let s10 = sum_comb_y - s00;
    let pairs = comb2(n);
    let s11 = pairs - s00 - s01 - s10;

    let rand_index = (s00 + s11) as f64 / pairs as f64;

    let expected = (sum_comb_x as f64) * (sum_comb_y as f64) / pairs as f64;
    let mean_comb = (sum_comb_x + sum_comb_y) as f64 / 2.0;
    let adjusted_rand_index = if mean_comb - expected > 0.0 {
        (s00 as f64 - expected) / (mean_comb - expected)
    } else {
        1.0
    };

    let fowlkes_mallows_index = if s00 + s10 > 0 && s00 + s01 > 0 {
        s00 as f64 / (((s00 + s10) as f64) * ((s00 + s01) as f64)).sqrt()
    } else {
        1.0
    };

    let jaccard_index = if s00 + s10 + s01 > 0 {
        s00 as f64 / (s00 + s10 + s01) as f64
    } else {
        1.0
    };

    // every counted cell is positive, so no log of zero below
    let nf = n as f64;
    let mutual_information: f64 = cells
        .iter()
        .map(|(&(a, b), &count)| {
            let count = count as f64;
            count / nf
                * (nf.ln() + count.ln()
                    - (marginal_x[a] as f64).ln()
                    - (marginal_y[b] as f64).ln())
        })
        .sum();
    let denominator = entropy(marginal_x.values().copied(), n)
        + entropy(marginal_y.values().copied(), n);
    let normalized_mutual_information = if denominator > 0.0 {
        2.0 * mutual_information / denominator
    } else {
        // both sides are a single cluster, hence identical partitions
        1.0
    };

    SimilarityIndices {
        jaccard_index,
        fowlkes_mallows_index,
        rand_index,
        adjusted_rand_index,
        reference_purity: 0.0,
        constructed_purity: 0.0,
        normalized_mutual_information,
    }
}

fn entropy(freqs: impl Iterator<Item = u64>, n: u64) -> f64 {
    let nf = n as f64;
    -freqs
        .map(|count| {
            let count = count as f64;
            count / nf * (count.ln() - nf.ln())
        })
        .sum::<f64>()
}

/// Fraction of reads covered by the per-cluster majority partner label.
fn purity(x: &[String], y: &[String]) -> f64 {
    let mut majority: HashMap<&str, HashMap<&str, u64>> = HashMap::new();
    for (a, b) in x.iter().zip(y) {
        *majority
            .entry(a.as_str())
            .or_default()
            .entry(b.as_str())
            .or_insert(0) += 1;
    }

    let majority_votes: u64 = majority
        .values()
        .map(|counts| counts.values().copied().max().unwrap_or(0))
        .sum();
    majority_votes as f64 / x.len() as f64
}

fn votes(x: &[Option<String>], y: &[Option<String>]) -> Vec<Vec<u64>> {
    assert_eq!(x.len(), y.len());

    let mut per_cluster: IndexMap<&str, HashMap<&str, u64>> = IndexMap::new();
    for (a, b) in x.iter().zip(y) {
        if let (Some(a), Some(b)) = (a, b) {
            *per_cluster
                .entry(a.as_str())
                .or_default()
                .entry(b.as_str())
                .or_insert(0) += 1;
        }
    }

    per_cluster
        .values()
        .map(|counts| {
            let mut vote: Vec<u64> = counts.values().copied().collect();
            vote.sort_unstable_by(|a, b| b.cmp(a));
            while vote.len() < 2 {
                vote.push(0);
            }
            vote
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn labels(names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|n| Some((*n).to_string())).collect()
    }

    fn compare(x: &[&str], y: &[&str]) -> PartitionCompare {
        PartitionCompare::new(labels(x), labels(y))
    }

    #[test]
    fn test_identical_partitions_are_perfect() {
        let mut cmp = compare(&["a", "a", "b", "b"], &["1", "1", "2", "2"]);
        let idx = cmp.indices().clone();
        assert_relative_eq!(idx.rand_index, 1.0);
        assert_relative_eq!(idx.adjusted_rand_index, 1.0);
        assert_relative_eq!(idx.fowlkes_mallows_index, 1.0);
        assert_relative_eq!(idx.jaccard_index, 1.0);
        assert_relative_eq!(idx.normalized_mutual_information, 1.0);
        assert_relative_eq!(idx.constructed_purity, 1.0);
        assert_relative_eq!(idx.reference_purity, 1.0);
    }

    #[test]
    fn test_single_cluster_vs_singletons() {
        let mut cmp = compare(&["a", "a", "a", "a"], &["1", "2", "3", "4"]);
        let idx = cmp.indices().clone();
        assert_relative_eq!(idx.rand_index, 0.0);
        assert_relative_eq!(idx.fowlkes_mallows_index, 0.0);
        assert_relative_eq!(idx.jaccard_index, 0.0);
        assert_relative_eq!(idx.constructed_purity, 0.25);
        assert_relative_eq!(idx.reference_purity, 1.0);
    }

    #[test]
    fn test_symmetry_of_pair_indices() {
        let x = ["a", "a", "b", "b", "c", "c"];
        let y = ["1", "2", "2", "3", "3", "3"];
        let mut fwd = compare(&x, &y);
        let mut bwd = compare(&y, &x);
        let fwd = fwd.indices().clone();
        let bwd = bwd.indices().clone();
        assert_relative_eq!(fwd.rand_index, bwd.rand_index);
        assert_relative_eq!(fwd.adjusted_rand_index, bwd.adjusted_rand_index);
        assert_relative_eq!(fwd.fowlkes_mallows_index, bwd.fowlkes_mallows_index);
        assert_relative_eq!(fwd.jaccard_index, bwd.jaccard_index);
        assert_relative_eq!(
            fwd.normalized_mutual_information,
            bwd.normalized_mutual_information
        );
        // purity swaps direction
        assert_relative_eq!(fwd.constructed_purity, bwd.reference_purity);
        assert_relative_eq!(fwd.reference_purity, bwd.constructed_purity);
    }

    #[test]
    fn test_unassigned_reads_never_co_cluster() {
        let mut cmp = PartitionCompare::new(
            vec![None, None, Some("a".to_string()), Some("a".to_string())],
            vec![None, None, Some("1".to_string()), Some("1".to_string())],
        );
        let idx = cmp.indices().clone();
        // the two unassigned reads are distinct singletons on both sides,
        // so agreement stays perfect
        assert_relative_eq!(idx.rand_index, 1.0);
        assert_relative_eq!(idx.adjusted_rand_index, 1.0);
    }

    #[test]
    fn test_votes_sorted_and_padded() {
        let mut cmp = compare(&["a", "a", "a", "b"], &["1", "1", "2", "1"]);
        let votes_x = cmp.votes(true).to_vec();
        assert_eq!(votes_x, vec![vec![2, 1], vec![1, 0]]);
    }

    #[test]
    fn test_votes_skip_unassigned_pairs() {
        let mut cmp = PartitionCompare::new(
            vec![Some("a".to_string()), Some("a".to_string())],
            vec![Some("1".to_string()), None],
        );
        assert_eq!(cmp.votes(true).to_vec(), vec![vec![1, 0]]);
    }

    #[test]
    fn test_prune_masks_small_clusters_and_invalidates() {
        let mut cmp = compare(&["a", "a", "b", "b"], &["1", "1", "2", "2"]);
        let before = cmp.indices().clone();
        assert_relative_eq!(before.rand_index, 1.0);

        // both X clusters fall below the threshold and dissolve into
        // singletons; the cached indices must be recomputed
        cmp.prune(3, 1);
        let after = cmp.indices().clone();

        assert_ne!(before, after);
        assert_relative_eq!(after.rand_index, 2.0 / 3.0);
        assert_relative_eq!(after.constructed_purity, 1.0);
        assert_relative_eq!(after.reference_purity, 0.5);
    }

    #[test]
    fn test_prune_uses_original_sizes() {
        let mut cmp = compare(&["a", "a", "b"], &["1", "1", "1"]);
        cmp.prune(1, 1);
        // nothing masked at threshold 1; sizes were computed at ingest
        let idx = cmp.indices().clone();
        assert_relative_eq!(idx.reference_purity, 1.0);
    }

    #[test]
    fn test_from_rcms_unions_id_universe() {
        let mut a = Rcm::new();
        a.insert("r1".to_string(), Some("c1".to_string()));
        a.insert("r2".to_string(), Some("c1".to_string()));
        let mut b = Rcm::new();
        b.insert("r2".to_string(), Some("k1".to_string()));
        b.insert("r3".to_string(), Some("k1".to_string()));

        let cmp = PartitionCompare::from_rcms(&a, &b);
        assert_eq!(cmp.len(), 3);
    }
}
