use crate::matching::{BidirectionalMatch, MultiplicityRelation};
use crate::tools::NeighborMatcher;
use crate::{RepquastError, Result};
use std::path::Path;

/// Reference-based match quality as a function of minimum cluster size and
/// edit-distance threshold.
///
/// Construction accumulates, for every matched cluster pair, the minimum of
/// the two abundances (after trust/trash saturation of the reference side)
/// into per-cluster, per-distance grids, makes the grids cumulative along
/// the distance axis and keeps one sorted marginal per distance. All
/// queries are binary searches over those marginals.
#[derive(Debug)]
pub struct RepertoireMatch {
    tau_max: u32,
    trust_cutoff: Option<u64>,
    trash_cutoff: Option<u64>,
    sensitivity_vectors: Vec<Vec<u64>>,
    precision_vectors: Vec<Vec<u64>>,
    reference_sum: Vec<Vec<u64>>,
    constructed_sum: Vec<Vec<u64>>,
    reference_abundances: Vec<u64>,
    constructed_abundances: Vec<u64>,
    multiplicity: MultiplicityRelation,
    matching: BidirectionalMatch,
}

/// A per-distance increment view of one measure at a fixed size threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceHistogram {
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

/// Measures derivable from the match grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Sensitivity,
    Precision,
    Fdr,
    Ref2Cons,
    Cons2Ref,
}

impl RepertoireMatch {
    /// Match two centroid files through the external matcher and build the
    /// metric grids.
    pub fn from_files(
        matcher: &dyn NeighborMatcher,
        constructed: &Path,
        reference: &Path,
        tau_max: u32,
        trust_cutoff: Option<u64>,
        trash_cutoff: Option<u64>,
    ) -> Result<Self> {
        let matching = BidirectionalMatch::compute(matcher, constructed, reference, tau_max)?;
        matching.check();
        Self::from_matching(matching, tau_max, trust_cutoff, trash_cutoff)
    }

    /// Build the metric grids from an existing bidirectional relation.
    pub fn from_matching(
        matching: BidirectionalMatch,
        tau_max: u32,
        trust_cutoff: Option<u64>,
        trash_cutoff: Option<u64>,
    ) -> Result<Self> {
        if let (Some(trash), Some(trust)) = (trash_cutoff, trust_cutoff) {
            if trash > trust {
                return Err(RepquastError::Precondition(format!(
                    "trash cutoff {trash} exceeds trust cutoff {trust}"
                )));
            }
        }

        let n_ref = matching.reference_abundances.len();
        let n_cons = matching.constructed_abundances.len();
        let width = tau_max as usize + 1;

        let mut reference = vec![vec![0u64; width]; n_ref];
        let mut constructed = vec![vec![0u64; width]; n_cons];
        let mut reference_sum = vec![vec![0u64; width]; n_ref];
        let mut constructed_sum = vec![vec![0u64; width]; n_cons];

        for (i, neighbors) in matching.fwd.iter().enumerate() {
            for &(j, d) in neighbors {
                let d = d as usize;
                let a_r = matching.reference_abundances[j];
                let a_c = matching.constructed_abundances[i];

                reference_sum[j][d] += a_c;
                constructed_sum[i][d] += a_r;

                // trust saturates the reference abundance to +inf (the min
                // becomes a_c), trash to -inf (the edge never wins a max)
                let min_abundance = if trust_cutoff.map_or(false, |t| a_r >= t) {
                    Some(a_c)
                } else if trash_cutoff.map_or(false, |t| a_r < t) {
                    None
                } else {
                    Some(a_c.min(a_r))
                };

                if let Some(m) = min_abundance {
                    reference[j][d] = reference[j][d].max(m);
                    constructed[i][d] = constructed[i][d].max(m);
                }
            }
        }

        for row in reference.iter_mut().chain(constructed.iter_mut()) {
            for d in 1..width {
                row[d] = row[d].max(row[d - 1]);
            }
        }
        for row in reference_sum.iter_mut().chain(constructed_sum.iter_mut()) {
            for d in 1..width {
                row[d] += row[d - 1];
            }
        }

        let matched_sums: Vec<u64> = reference_sum.iter().map(|row| row[0]).collect();
        let multiplicity =
            MultiplicityRelation::new(&matching.reference_abundances, &matched_sums);

        let sensitivity_vectors = sorted_columns(&reference, width);
        let precision_vectors = sorted_columns(&constructed, width);

        let mut reference_abundances = matching.reference_abundances.clone();
        reference_abundances.sort_unstable();
        let mut constructed_abundances = matching.constructed_abundances.clone();
        constructed_abundances.sort_unstable();

        Ok(Self {
            tau_max,
            trust_cutoff,
            trash_cutoff,
            sensitivity_vectors,
            precision_vectors,
            reference_sum,
            constructed_sum,
            reference_abundances,
            constructed_abundances,
            multiplicity,
            matching,
        })
    }

    pub fn tau_max(&self) -> u32 {
        self.tau_max
    }

    pub fn trust_cutoff(&self) -> Option<u64> {
        self.trust_cutoff
    }

    pub fn matching(&self) -> &BidirectionalMatch {
        &self.matching
    }

    pub fn multiplicity_relation(&self) -> &MultiplicityRelation {
        &self.multiplicity
    }

    /// Cumulative constructed abundance matched to reference cluster `j`
    /// within distance `d`.
    pub fn reference_sum(&self, j: usize, d: u32) -> u64 {
        self.reference_sum[j][self.tau_index(d)]
    }

    /// Cumulative reference abundance matched to constructed cluster `i`
    /// within distance `d`.
    pub fn constructed_sum(&self, i: usize, d: u32) -> u64 {
        self.constructed_sum[i][self.tau_index(d)]
    }

    /// Number of reference clusters whose abundance meets the (saturated)
    /// size threshold.
    pub fn reference_size(&self, size: u64) -> u64 {
        assert!(size > 0, "size threshold must be positive");
        let mut size = size;
        if let Some(trust) = self.trust_cutoff {
            size = size.min(trust);
        }
        if let Some(trash) = self.trash_cutoff {
            size = size.max(trash);
        }
        count_ge(&self.reference_abundances, size)
    }

    /// Number of constructed clusters with abundance ≥ `size`.
    pub fn constructed_size(&self, size: u64) -> u64 {
        assert!(size > 0, "size threshold must be positive");
        count_ge(&self.constructed_abundances, size)
    }

    /// Reference clusters matched to some constructed cluster within
    /// distance `tau` with min-abundance ≥ `size`.
    pub fn ref2cons(&self, size: u64, tau: u32) -> u64 {
        assert!(size > 0, "size threshold must be positive");
        count_ge(&self.sensitivity_vectors[self.tau_index(tau)], size)
    }

    /// Constructed clusters matched to some reference cluster within
    /// distance `tau` with min-abundance ≥ `size`.
    pub fn cons2ref(&self, size: u64, tau: u32) -> u64 {
        assert!(size > 0, "size threshold must be positive");
        count_ge(&self.precision_vectors[self.tau_index(tau)], size)
    }

    pub fn sensitivity(&self, size: u64, tau: u32) -> f64 {
        let all = self.reference_size(size);
        let identified = self.ref2cons(size, tau);
        assert!(
            all >= identified,
            "invariant violated: ref2cons({size}, {tau}) = {identified} exceeds reference_size = {all}"
        );
        ratio(identified, all)
    }

    pub fn precision(&self, size: u64, tau: u32) -> f64 {
        let all = self.constructed_size(size);
        let matched = self.cons2ref(size, tau);
        assert!(
            all >= matched,
            "invariant violated: cons2ref({size}, {tau}) = {matched} exceeds constructed_size = {all}"
        );
        ratio(matched, all)
    }

    pub fn fdr(&self, size: u64, tau: u32) -> f64 {
        1.0 - self.precision(size, tau)
    }

    /// Harmonic mean of precision and sensitivity; 0 when both are 0.
    pub fn f1(&self, size: u64, tau: u32) -> f64 {
        let p = self.precision(size, tau);
        let r = self.sensitivity(size, tau);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn measure(&self, what: Measure, size: u64, tau: u32) -> f64 {
        match what {
            Measure::Sensitivity => self.sensitivity(size, tau),
            Measure::Precision => self.precision(size, tau),
            Measure::Fdr => self.fdr(size, tau),
            Measure::Ref2Cons => self.ref2cons(size, tau) as f64,
            Measure::Cons2Ref => self.cons2ref(size, tau) as f64,
        }
    }

    /// Per-distance increments of a cumulative measure at a fixed size.
    ///
    /// For counting and ratio measures, the final bar is the residual never
    /// matched within `tau_max`, labeled `>= tau_max+1`. FDR decreases in
    /// distance, so its view is the sequence of per-step drops with the
    /// terminal FDR as the last bar.
    pub fn distance_histogram(&self, size: u64, what: Measure) -> DistanceHistogram {
        let taus = 0..=self.tau_max;
        let mut values: Vec<f64> = taus.clone().map(|t| self.measure(what, size, t)).collect();
        let mut labels: Vec<String> = taus.map(|t| t.to_string()).collect();

        if what == Measure::Fdr {
            for d in 1..values.len() {
                values[d - 1] -= values[d];
            }
            let last = labels.len() - 1;
            labels[last] = format!(">= {}", self.tau_max);
        } else {
            let all = match what {
                Measure::Ref2Cons => self.reference_size(size) as f64,
                Measure::Cons2Ref => self.constructed_size(size) as f64,
                _ => 1.0,
            };
            let residual = all - values[values.len() - 1];
            for d in (1..values.len()).rev() {
                values[d] -= values[d - 1];
            }
            values.push(residual);
            labels.push(format!(">= {}", self.tau_max + 1));
        }

        DistanceHistogram { values, labels }
    }

    fn tau_index(&self, tau: u32) -> usize {
        assert!(
            tau <= self.tau_max,
            "distance {tau} exceeds tau_max {}",
            self.tau_max
        );
        tau as usize
    }
}

fn sorted_columns(grid: &[Vec<u64>], width: usize) -> Vec<Vec<u64>> {
    (0..width)
        .map(|d| {
            let mut column: Vec<u64> = grid.iter().map(|row| row[d]).collect();
            column.sort_unstable();
            column
        })
        .collect()
}

fn count_ge(sorted: &[u64], threshold: u64) -> u64 {
    (sorted.len() - sorted.partition_point(|&x| x < threshold)) as u64
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity_match(n: usize) -> RepertoireMatch {
        let fwd = (0..n).map(|i| vec![(i, 0)]).collect();
        let matching = BidirectionalMatch::from_parts(fwd, vec![1; n], vec![1; n]);
        RepertoireMatch::from_matching(matching, 0, None, None).unwrap()
    }

    #[test]
    fn test_identical_singletons_are_perfect() {
        let m = identity_match(4);
        assert_relative_eq!(m.sensitivity(1, 0), 1.0);
        assert_relative_eq!(m.precision(1, 0), 1.0);
        assert_relative_eq!(m.fdr(1, 0), 0.0);
        assert_relative_eq!(m.f1(1, 0), 1.0);
    }

    #[test]
    fn test_counts_and_ratios() {
        // constructed {10, 3}, reference {8, 3, 2}; c0-r0 at d=1, c1-r1 at d=0
        let matching = BidirectionalMatch::from_parts(
            vec![vec![(0, 1)], vec![(1, 0)]],
            vec![10, 3],
            vec![8, 3, 2],
        );
        let m = RepertoireMatch::from_matching(matching, 2, None, None).unwrap();

        assert_eq!(m.reference_size(1), 3);
        assert_eq!(m.reference_size(4), 1);
        assert_eq!(m.constructed_size(1), 2);

        assert_eq!(m.ref2cons(1, 0), 1); // only r1 matched at d=0
        assert_eq!(m.ref2cons(1, 1), 2);
        assert_eq!(m.cons2ref(1, 1), 2);

        assert_relative_eq!(m.sensitivity(1, 1), 2.0 / 3.0);
        assert_relative_eq!(m.precision(1, 1), 1.0);

        // min-abundance gating: pair (10, 8) supports sizes up to 8
        assert_eq!(m.ref2cons(8, 1), 1);
        assert_eq!(m.ref2cons(9, 1), 0);
    }

    #[test]
    fn test_sensitivity_monotone_in_distance() {
        let matching = BidirectionalMatch::from_parts(
            vec![vec![(0, 2)], vec![(1, 1), (2, 4)]],
            vec![5, 6],
            vec![5, 4, 7],
        );
        let m = RepertoireMatch::from_matching(matching, 4, None, None).unwrap();
        for size in 1..=8 {
            for tau in 1..=4 {
                assert!(m.sensitivity(size, tau) >= m.sensitivity(size, tau - 1));
            }
        }
    }

    #[test]
    fn test_trust_saturation_promotes_large_references() {
        // reference abundance 100 >= trust 50, so the pair counts at the
        // constructed abundance even though min(3, 100) would also be 3
        let matching =
            BidirectionalMatch::from_parts(vec![vec![(0, 0)]], vec![3], vec![100]);
        let m = RepertoireMatch::from_matching(matching, 0, Some(50), None).unwrap();

        // threshold 60 saturates to the trust cutoff on the reference side
        assert_eq!(m.reference_size(60), 1);
        // and the matched min-abundance is the constructed abundance 3
        assert_eq!(m.ref2cons(3, 0), 1);
        assert_eq!(m.ref2cons(4, 0), 0);
    }

    #[test]
    fn test_trash_saturation_drops_tiny_references() {
        let matching =
            BidirectionalMatch::from_parts(vec![vec![(0, 0)]], vec![3], vec![1]);
        let m = RepertoireMatch::from_matching(matching, 0, None, Some(2)).unwrap();
        // the edge exists but never wins a max entry
        assert_eq!(m.ref2cons(1, 0), 0);
        // the sum grids still see the raw abundances
        assert_eq!(m.reference_sum(0, 0), 3);
    }

    #[test]
    fn test_trash_above_trust_rejected() {
        let matching = BidirectionalMatch::from_parts(vec![vec![]], vec![1], vec![1]);
        let err =
            RepertoireMatch::from_matching(matching, 0, Some(2), Some(5)).unwrap_err();
        assert!(matches!(err, RepquastError::Precondition(_)));
    }

    #[test]
    fn test_distance_histogram_counts() {
        let matching = BidirectionalMatch::from_parts(
            vec![vec![(0, 0)], vec![(1, 2)]],
            vec![4, 4],
            vec![4, 4, 4],
        );
        let m = RepertoireMatch::from_matching(matching, 2, None, None).unwrap();

        let hist = m.distance_histogram(1, Measure::Ref2Cons);
        assert_eq!(hist.labels, vec!["0", "1", "2", ">= 3"]);
        // one cluster at d=0, none new at d=1, one at d=2, one never matched
        assert_eq!(hist.values, vec![1.0, 0.0, 1.0, 1.0]);
        let total: f64 = hist.values.iter().sum();
        assert_relative_eq!(total, m.reference_size(1) as f64);
    }

    #[test]
    fn test_fdr_histogram_is_decreasing_view() {
        let matching = BidirectionalMatch::from_parts(
            vec![vec![(0, 0)], vec![(1, 1)], vec![]],
            vec![2, 2, 2],
            vec![2, 2],
        );
        let m = RepertoireMatch::from_matching(matching, 1, None, None).unwrap();
        let hist = m.distance_histogram(1, Measure::Fdr);
        assert_eq!(hist.labels, vec!["0", ">= 1"]);
        // fdr(0) = 2/3, fdr(1) = 1/3: drop of 1/3, then the terminal third
        assert_relative_eq!(hist.values[0], 1.0 / 3.0);
        assert_relative_eq!(hist.values[1], 1.0 / 3.0);
    }

    #[test]
    #[should_panic(expected = "size threshold must be positive")]
    fn test_zero_size_rejected() {
        identity_match(1).reference_size(0);
    }
}
