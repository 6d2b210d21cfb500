//! Reference-based matching driven through the in-process matcher, plus
//! randomized checks of the metric invariants.

use approx::assert_relative_eq;
use proptest::prelude::*;
use repquast::bio::fasta::write_fasta;
use repquast::bio::Sequence;
use repquast::matching::{BidirectionalMatch, RepertoireMatch};
use repquast::tools::mock::NaiveMatcher;
use std::path::Path;

fn centroid(name: &str, size: u64, seq: &[u8]) -> Sequence {
    Sequence::new(format!("cluster___{name}___size___{size}"), seq.to_vec())
}

fn write_repertoire(path: &Path, centroids: &[Sequence]) {
    write_fasta(path, centroids).unwrap();
}

#[test]
fn identical_singleton_repertoires_are_perfect_at_tau_zero() {
    let dir = tempfile::tempdir().unwrap();
    let constructed = dir.path().join("constructed.fa");
    let reference = dir.path().join("reference.fa");

    let clusters = vec![
        centroid("a", 1, b"ACGTACGTAC"),
        centroid("b", 1, b"TTTTCCCCGG"),
        centroid("c", 1, b"GAGAGAGAGA"),
    ];
    write_repertoire(&constructed, &clusters);
    write_repertoire(&reference, &clusters);

    let m = RepertoireMatch::from_files(
        &NaiveMatcher::new(),
        &constructed,
        &reference,
        0,
        None,
        None,
    )
    .unwrap();

    assert_relative_eq!(m.sensitivity(1, 0), 1.0);
    assert_relative_eq!(m.precision(1, 0), 1.0);
    assert_relative_eq!(m.f1(1, 0), 1.0);
}

#[test]
fn merged_relation_is_orientation_independent() {
    let dir = tempfile::tempdir().unwrap();
    let left = dir.path().join("left.fa");
    let right = dir.path().join("right.fa");

    write_repertoire(
        &left,
        &[centroid("a", 3, b"ACGTACGT"), centroid("b", 5, b"TTTTTTTT")],
    );
    write_repertoire(
        &right,
        &[
            centroid("x", 2, b"ACGTACGA"),
            centroid("y", 7, b"TTTTTTTA"),
            centroid("z", 1, b"GGGGGGGG"),
        ],
    );

    let matcher = NaiveMatcher::new();
    let fwd = BidirectionalMatch::compute(&matcher, &left, &right, 2).unwrap();
    let bwd = BidirectionalMatch::compute(&matcher, &right, &left, 2).unwrap();

    // matching left against right forward equals matching right against
    // left transposed
    assert_eq!(fwd.fwd, bwd.rev);
    assert_eq!(fwd.rev, bwd.fwd);
}

#[test]
fn partial_overlap_yields_fractional_measures() {
    let dir = tempfile::tempdir().unwrap();
    let constructed = dir.path().join("constructed.fa");
    let reference = dir.path().join("reference.fa");

    // two of three reference clusters recovered, one spurious constructed
    write_repertoire(
        &constructed,
        &[
            centroid("c1", 10, b"ACGTACGTACGT"),
            centroid("c2", 10, b"CCCCGGGGTTTT"),
            centroid("junk", 10, b"AAAAAAAAAAAA"),
        ],
    );
    write_repertoire(
        &reference,
        &[
            centroid("r1", 10, b"ACGTACGTACGT"),
            centroid("r2", 10, b"CCCCGGGGTTTA"),
            centroid("r3", 10, b"GTGTGTGTGTGT"),
        ],
    );

    let m = RepertoireMatch::from_files(
        &NaiveMatcher::new(),
        &constructed,
        &reference,
        1,
        None,
        None,
    )
    .unwrap();

    assert_relative_eq!(m.sensitivity(1, 0), 1.0 / 3.0);
    assert_relative_eq!(m.sensitivity(1, 1), 2.0 / 3.0);
    assert_relative_eq!(m.precision(1, 1), 2.0 / 3.0);
    assert_relative_eq!(m.fdr(1, 1), 1.0 / 3.0);

    let f1 = m.f1(1, 1);
    assert_relative_eq!(f1, 2.0 / 3.0);
}

proptest! {
    #[test]
    fn metric_invariants_hold_on_random_relations(
        raw_edges in proptest::collection::vec((0usize..5, 0usize..5, 0u32..=3), 0..24),
        constructed_abundances in proptest::collection::vec(1u64..40, 5),
        reference_abundances in proptest::collection::vec(1u64..40, 5),
    ) {
        let mut fwd = vec![Vec::new(); 5];
        let mut seen = std::collections::HashSet::new();
        for (i, j, d) in raw_edges {
            // each (query, target) pair appears at most once
            if seen.insert((i, j)) {
                fwd[i].push((j, d));
            }
        }

        let matching =
            BidirectionalMatch::from_parts(fwd, constructed_abundances, reference_abundances);
        let m = RepertoireMatch::from_matching(matching, 3, None, None).unwrap();

        for size in 1..=41u64 {
            let mut previous = 0.0;
            for tau in 0..=3u32 {
                let sensitivity = m.sensitivity(size, tau);
                prop_assert!((0.0..=1.0).contains(&sensitivity));
                prop_assert!(sensitivity >= previous);
                previous = sensitivity;

                prop_assert!((m.precision(size, tau) + m.fdr(size, tau) - 1.0).abs() < 1e-12);
                prop_assert!(m.reference_size(size) >= m.ref2cons(size, tau));
                prop_assert!(m.constructed_size(size) >= m.cons2ref(size, tau));
            }
        }
    }
}
