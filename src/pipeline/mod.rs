//! End-to-end evaluation: file paths in, one [`Report`] out.

use crate::bio::rcm::{parse_rcm, write_rcm, Rcm};
use crate::config::EvaluationConfig;
use crate::matching::RepertoireMatch;
use crate::partition::PartitionCompare;
use crate::reconstruct::RcmReconstructor;
use crate::report::{ReferenceBased, RepertoireSection, Report};
use crate::stats::RepertoireStats;
use crate::tools::NeighborMatcher;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Input files for one evaluation run. Only `constructed` is mandatory;
/// every metric stream whose inputs are present is computed.
#[derive(Debug, Clone, Default)]
pub struct EvaluationInputs {
    /// Constructed repertoire centroids.
    pub constructed: PathBuf,
    /// Read-to-cluster map of the constructed repertoire. Reconstructed
    /// from `reads` when absent.
    pub constructed_rcm: Option<PathBuf>,
    /// Reference repertoire centroids.
    pub reference: Option<PathBuf>,
    /// Read-to-cluster map of the reference repertoire.
    pub reference_rcm: Option<PathBuf>,
    /// The original reads both repertoires cluster.
    pub reads: Option<PathBuf>,
    /// Where to persist a reconstructed RCM, when one is produced.
    pub reconstructed_rcm_out: Option<PathBuf>,
}

pub fn evaluate(
    matcher: &dyn NeighborMatcher,
    inputs: &EvaluationInputs,
    config: &EvaluationConfig,
) -> Result<Report> {
    config.validate()?;
    let mut report = Report::default();

    let constructed_rcm = resolve_constructed_rcm(matcher, inputs, config)?;

    if let Some(reference) = &inputs.reference {
        info!("matching constructed repertoire against the reference");
        let matched = RepertoireMatch::from_files(
            matcher,
            &inputs.constructed,
            reference,
            config.tau_max,
            config.trust_cutoff,
            config.trash_cutoff,
        )?;
        let mut section = ReferenceBased::from_match(&matched, config.report_min_size());

        if let (Some(constructed_rcm), Some(reference_rcm)) =
            (&constructed_rcm, &inputs.reference_rcm)
        {
            let reference_rcm = parse_rcm(reference_rcm)?;
            let mut compare = PartitionCompare::from_rcms(constructed_rcm, &reference_rcm);
            section.clustering = Some(compare.indices().clone());
        }

        report.reference_based = Some(section);
    }

    if let Some(reads) = &inputs.reads {
        if let Some(rcm) = &constructed_rcm {
            info!("computing intrinsic statistics of the constructed repertoire");
            let stats = constructed_stats(reads, rcm, &inputs.constructed, config)?;
            report.constructed_stats =
                Some(RepertoireSection::from_stats(&stats, config.pv_threshold));
        }

        if let (Some(reference), Some(reference_rcm)) =
            (&inputs.reference, &inputs.reference_rcm)
        {
            info!("computing intrinsic statistics of the reference repertoire");
            let rcm = parse_rcm(reference_rcm)?;
            let stats = constructed_stats(reads, &rcm, reference, config)?;
            report.reference_stats =
                Some(RepertoireSection::from_stats(&stats, config.pv_threshold));
        }
    }

    Ok(report)
}

/// Load the constructed RCM, or synthesize one from the reads when only a
/// centroid file was given.
fn resolve_constructed_rcm(
    matcher: &dyn NeighborMatcher,
    inputs: &EvaluationInputs,
    config: &EvaluationConfig,
) -> Result<Option<Rcm>> {
    if let Some(path) = &inputs.constructed_rcm {
        return Ok(Some(parse_rcm(path)?));
    }

    let Some(reads) = &inputs.reads else {
        return Ok(None);
    };

    info!("no constructed RCM given, reconstructing one from the reads");
    let mut reconstructor = RcmReconstructor::new(
        matcher,
        &config.reconstruction_taus,
        config.exhaustive_fallback,
        config.rng_seed,
    );
    let outcome = reconstructor.reconstruct(reads, &inputs.constructed)?;
    info!(
        "reconstruction finished with {} uncertain assignments",
        outcome.uncertain
    );

    if let Some(out) = &inputs.reconstructed_rcm_out {
        write_rcm(&outcome.rcm, out)?;
    }

    Ok(Some(outcome.rcm))
}

fn constructed_stats(
    reads: &Path,
    rcm: &Rcm,
    centroids: &Path,
    config: &EvaluationConfig,
) -> Result<RepertoireStats> {
    let read_records = crate::bio::read_sequence_file(reads)?;
    let centroid_records = crate::bio::read_sequence_file(centroids)?;
    Ok(RepertoireStats::build(
        read_records,
        rcm,
        &centroid_records,
        config.min_size as usize,
    ))
}
