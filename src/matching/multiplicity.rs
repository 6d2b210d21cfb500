use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Size-vs-size relation between matched reference and constructed
/// clusters, smoothed by suffix medians and means of the size rates.
///
/// For each reference cluster with a positive matched constructed sum, the
/// pair `(reference size, constructed sum)` contributes a rate `y/x`. Rates
/// are sorted by reference size; the smoothed rate at a size is the
/// median (or mean) over that size's suffix of the sorted rate sequence.
#[derive(Debug, Clone)]
pub struct MultiplicityRelation {
    pairs: Vec<(u64, u64)>,
    unique_sizes: Vec<u64>,
    median_rates: Vec<f64>,
    mean_rates: Vec<f64>,
}

impl MultiplicityRelation {
    /// `reference_abundances[j]` is the declared size of reference cluster
    /// `j`; `matched_sums[j]` is the total constructed abundance matched to
    /// it at the relation's fixed distance.
    pub fn new(reference_abundances: &[u64], matched_sums: &[u64]) -> Self {
        assert_eq!(reference_abundances.len(), matched_sums.len());

        let mut pairs: Vec<(u64, u64)> = reference_abundances
            .iter()
            .zip(matched_sums)
            .filter(|(&x, &y)| x > 0 && y > 0)
            .map(|(&x, &y)| (x, y))
            .collect();
        pairs.sort_by_key(|&(x, _)| x);

        let rates: Vec<f64> = pairs.iter().map(|&(x, y)| y as f64 / x as f64).collect();
        let median_all = reversed_cumulative_median(&rates);
        let mean_all = reversed_cumulative_mean(&rates);

        // one point per distinct reference size, keeping the last value
        let mut unique_sizes = Vec::new();
        let mut median_rates = Vec::new();
        let mut mean_rates = Vec::new();
        for (k, &(x, _)) in pairs.iter().enumerate() {
            if unique_sizes.last() == Some(&x) {
                *median_rates.last_mut().expect("parallel to unique_sizes") = median_all[k];
                *mean_rates.last_mut().expect("parallel to unique_sizes") = mean_all[k];
            } else {
                unique_sizes.push(x);
                median_rates.push(median_all[k]);
                mean_rates.push(mean_all[k]);
            }
        }

        Self {
            pairs,
            unique_sizes,
            median_rates,
            mean_rates,
        }
    }

    /// Smoothed median rate at the smallest represented size ≥ `size`.
    /// Querying past the largest represented size is a caller error.
    pub fn median_rate(&self, size: u64) -> f64 {
        self.median_rates[self.lookup(size)]
    }

    /// Smoothed mean rate at the smallest represented size ≥ `size`.
    pub fn mean_rate(&self, size: u64) -> f64 {
        self.mean_rates[self.lookup(size)]
    }

    fn lookup(&self, size: u64) -> usize {
        let i = self.unique_sizes.partition_point(|&x| x < size);
        assert!(
            i < self.unique_sizes.len(),
            "no reference cluster of size >= {size} in the multiplicity relation"
        );
        i
    }

    /// Matched `(reference size, constructed sum)` pairs, sorted by
    /// reference size. Exposed for plot rendering.
    pub fn pairs(&self) -> &[(u64, u64)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// `out[k]` = median of `values[k..]`, computed by feeding the sequence to
/// a dual-heap order statistic from the right.
fn reversed_cumulative_median(values: &[f64]) -> Vec<f64> {
    let mut median = StreamingMedian::new();
    let mut out = vec![0.0; values.len()];
    for (k, &v) in values.iter().enumerate().rev() {
        median.push(v);
        out[k] = median.median();
    }
    out
}

/// `out[k]` = mean of `values[k..]`.
fn reversed_cumulative_mean(values: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    let mut sum = 0.0;
    for (k, &v) in values.iter().enumerate().rev() {
        sum += v;
        out[k] = sum / (values.len() - k) as f64;
    }
    out
}

/// Classic two-heap running median: the lower half in a max-heap, the
/// upper half in a min-heap, sizes kept within one of each other.
struct StreamingMedian {
    lower: BinaryHeap<OrderedFloat<f64>>,
    upper: BinaryHeap<Reverse<OrderedFloat<f64>>>,
}

impl StreamingMedian {
    fn new() -> Self {
        Self {
            lower: BinaryHeap::new(),
            upper: BinaryHeap::new(),
        }
    }

    fn push(&mut self, value: f64) {
        let value = OrderedFloat(value);
        match self.lower.peek() {
            Some(&top) if value > top => self.upper.push(Reverse(value)),
            _ => self.lower.push(value),
        }

        if self.lower.len() > self.upper.len() + 1 {
            let moved = self.lower.pop().expect("lower heap is non-empty");
            self.upper.push(Reverse(moved));
        } else if self.upper.len() > self.lower.len() {
            let Reverse(moved) = self.upper.pop().expect("upper heap is non-empty");
            self.lower.push(moved);
        }
    }

    fn median(&self) -> f64 {
        debug_assert!(!self.lower.is_empty());
        let low = self.lower.peek().expect("median of empty sequence").0;
        if self.lower.len() > self.upper.len() {
            low
        } else {
            let high = self.upper.peek().expect("heaps are balanced").0 .0;
            (low + high) / 2.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reversed_cumulative_median() {
        let meds = reversed_cumulative_median(&[5.0, 1.0, 3.0]);
        // suffixes: [5,1,3] -> 3, [1,3] -> 2, [3] -> 3
        assert_relative_eq!(meds[0], 3.0);
        assert_relative_eq!(meds[1], 2.0);
        assert_relative_eq!(meds[2], 3.0);
    }

    #[test]
    fn test_reversed_cumulative_mean() {
        let means = reversed_cumulative_mean(&[6.0, 2.0, 4.0]);
        assert_relative_eq!(means[0], 4.0);
        assert_relative_eq!(means[1], 3.0);
        assert_relative_eq!(means[2], 4.0);
    }

    #[test]
    fn test_rates_and_lookup() {
        // reference sizes 2,4,8 matched with sums 4,4,8 -> rates 2.0, 1.0, 1.0
        let relation = MultiplicityRelation::new(&[4, 2, 8], &[4, 4, 8]);
        assert_eq!(relation.pairs(), &[(2, 4), (4, 4), (8, 8)]);

        // suffix medians over [2.0, 1.0, 1.0]
        assert_relative_eq!(relation.median_rate(1), 1.0);
        assert_relative_eq!(relation.median_rate(3), 1.0);
        assert_relative_eq!(relation.median_rate(8), 1.0);
        assert_relative_eq!(relation.mean_rate(1), 4.0 / 3.0);
    }

    #[test]
    fn test_duplicate_sizes_keep_last_value() {
        // sizes 2,2,4 with sums 2,4,4 -> rates 1.0, 2.0, 1.0
        let relation = MultiplicityRelation::new(&[2, 2, 4], &[2, 4, 4]);
        // at size 2 the later of the two equal-size points wins:
        // suffix [2.0, 1.0] -> median 1.5
        assert_relative_eq!(relation.median_rate(2), 1.5);
        assert_relative_eq!(relation.median_rate(4), 1.0);
    }

    #[test]
    fn test_zero_pairs_filtered() {
        let relation = MultiplicityRelation::new(&[0, 3, 5], &[7, 0, 10]);
        assert_eq!(relation.pairs(), &[(5, 10)]);
        assert_relative_eq!(relation.median_rate(5), 2.0);
    }

    #[test]
    #[should_panic(expected = "no reference cluster of size")]
    fn test_out_of_range_query_panics() {
        let relation = MultiplicityRelation::new(&[2], &[2]);
        relation.median_rate(3);
    }
}
