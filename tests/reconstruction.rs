//! RCM reconstruction and file round-trips.

use repquast::bio::fasta::write_fasta;
use repquast::bio::rcm::{parse_rcm, write_rcm};
use repquast::bio::Sequence;
use repquast::reconstruct::RcmReconstructor;
use repquast::tools::mock::NaiveMatcher;
use std::path::Path;

fn write_inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let reads_path = dir.join("reads.fa");
    let centroids_path = dir.join("centroids.fa");

    // two lineages around distinct centroids, with noisy copies
    let mut reads = Vec::new();
    for (i, seq) in [
        b"ACGTACGTACGT".to_vec(),
        b"ACGTACGTACGA".to_vec(),
        b"ACGTACGTACCT".to_vec(),
    ]
    .into_iter()
    .enumerate()
    {
        reads.push(Sequence::new(format!("alpha_{i}"), seq));
    }
    for (i, seq) in [b"TTTTCCCCGGGG".to_vec(), b"TTTTCCCCGGGA".to_vec()]
        .into_iter()
        .enumerate()
    {
        reads.push(Sequence::new(format!("beta_{i}"), seq));
    }
    write_fasta(&reads_path, &reads).unwrap();

    write_fasta(
        &centroids_path,
        &[
            Sequence::new(
                "cluster___alpha___size___3".to_string(),
                b"ACGTACGTACGT".to_vec(),
            ),
            Sequence::new(
                "cluster___beta___size___2".to_string(),
                b"TTTTCCCCGGGG".to_vec(),
            ),
        ],
    )
    .unwrap();

    (reads_path, centroids_path)
}

#[test]
fn reconstructed_map_assigns_reads_to_their_lineage() {
    let dir = tempfile::tempdir().unwrap();
    let (reads_path, centroids_path) = write_inputs(dir.path());

    let matcher = NaiveMatcher::new();
    let mut reconstructor = RcmReconstructor::new(&matcher, &[1, 2, 4], false, 11);
    let outcome = reconstructor
        .reconstruct(&reads_path, &centroids_path)
        .unwrap();

    assert_eq!(outcome.rcm.len(), 5);
    for (id, cluster) in &outcome.rcm {
        let expected = if id.starts_with("alpha") { "alpha" } else { "beta" };
        assert_eq!(cluster.as_deref(), Some(expected), "read {id}");
    }
    assert_eq!(outcome.uncertain, 0);
}

#[test]
fn reconstruction_is_reproducible_with_a_fixed_seed() {
    let dir = tempfile::tempdir().unwrap();
    let (reads_path, centroids_path) = write_inputs(dir.path());

    let matcher = NaiveMatcher::new();
    let run = |seed: u64| {
        let mut reconstructor = RcmReconstructor::new(&matcher, &[1, 2, 4], false, seed);
        reconstructor
            .reconstruct(&reads_path, &centroids_path)
            .unwrap()
            .rcm
    };

    assert_eq!(run(3), run(3));
}

#[test]
fn written_reconstruction_roundtrips_through_the_rcm_format() {
    let dir = tempfile::tempdir().unwrap();
    let (reads_path, centroids_path) = write_inputs(dir.path());

    let matcher = NaiveMatcher::new();
    let mut reconstructor = RcmReconstructor::new(&matcher, &[2], false, 0);
    let outcome = reconstructor
        .reconstruct(&reads_path, &centroids_path)
        .unwrap();

    let rcm_path = dir.path().join("reconstructed.rcm");
    write_rcm(&outcome.rcm, &rcm_path).unwrap();
    let reparsed = parse_rcm(&rcm_path).unwrap();
    assert_eq!(reparsed, outcome.rcm);

    // a second write of the reparsed map is byte-identical
    let second_path = dir.path().join("second.rcm");
    write_rcm(&reparsed, &second_path).unwrap();
    assert_eq!(
        std::fs::read_to_string(&rcm_path).unwrap(),
        std::fs::read_to_string(&second_path).unwrap()
    );
}
