//! The aggregate evaluation record and its renderers.
//!
//! The engine fills a single [`Report`] from the three metric streams;
//! JSON comes from the serde tree, text from a fixed layout. Plot
//! rendering is delegated to consumers of the raw series.

pub mod text;

use crate::matching::RepertoireMatch;
use crate::partition::SimilarityIndices;
use crate::stats::{ErrorRateEstimates, RepertoireStats};
use crate::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Default, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_based: Option<ReferenceBased>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructed_stats: Option<RepertoireSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_stats: Option<RepertoireSection>,
}

/// Reference-based measures at one size threshold, plus the partition
/// agreement block when both RCMs were available.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceBased {
    pub min_size: u64,
    pub precision: f64,
    pub sensitivity: f64,
    pub cons2ref: u64,
    pub ref2cons: u64,
    pub constructed_size: u64,
    pub reference_size: u64,
    pub reference_vs_constructed_size_median_rate: f64,
    pub reference_vs_constructed_size_mean_rate: f64,
    // a flattened None contributes no keys
    #[serde(flatten)]
    pub clustering: Option<SimilarityIndices>,
}

impl ReferenceBased {
    /// Snapshot the match at distance 0 and size threshold `min_size`.
    pub fn from_match(matched: &RepertoireMatch, min_size: u64) -> Self {
        let relation = matched.multiplicity_relation();
        Self {
            min_size,
            precision: matched.precision(min_size, 0),
            sensitivity: matched.sensitivity(min_size, 0),
            cons2ref: matched.cons2ref(min_size, 0),
            ref2cons: matched.ref2cons(min_size, 0),
            constructed_size: matched.constructed_size(min_size),
            reference_size: matched.reference_size(min_size),
            reference_vs_constructed_size_median_rate: relation.median_rate(min_size),
            reference_vs_constructed_size_mean_rate: relation.mean_rate(min_size),
            clustering: None,
        }
    }
}

/// Intrinsic statistics of one repertoire.
#[derive(Debug, Clone, Serialize)]
pub struct RepertoireSection {
    pub error_rate: f64,
    pub error_rate_estimations: ErrorRateEstimates,
    pub bad_clusters: Vec<String>,
}

impl RepertoireSection {
    pub fn from_stats(stats: &RepertoireStats, pv_threshold: f64) -> Self {
        let estimations = stats.error_rates();
        let error_rate = estimations.first_third;
        Self {
            error_rate,
            error_rate_estimations: estimations,
            bad_clusters: stats.bad_cluster_ids(error_rate, pv_threshold),
        }
    }
}

impl Report {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::RepquastError::Config(format!("report serialization: {e}")))
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        text::render(self)
    }

    pub fn write_text<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }
}
