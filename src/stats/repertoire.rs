use crate::bio::rcm::{parse_rcm, Rcm};
use crate::bio::{self, Sequence};
use crate::stats::ClusterStats;
use crate::Result;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Per-read Poisson-mean estimators of the repertoire error rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorRateEstimates {
    pub mle: f64,
    pub first_len: f64,
    pub first_second: f64,
    pub first_third: f64,
}

impl ErrorRateEstimates {
    /// Estimate λ from a sample of per-read error counts.
    ///
    /// `mle` is the sample mean. The remaining estimators use the head of
    /// the count frequency spectrum and fall back to the MLE when no read
    /// is error-free.
    pub fn from_error_counts(counts: &[u64]) -> Self {
        if counts.is_empty() {
            return Self {
                mle: 0.0,
                first_len: 0.0,
                first_second: 0.0,
                first_third: 0.0,
            };
        }

        let n = counts.len() as f64;
        let mut freq: HashMap<u64, u64> = HashMap::new();
        for &c in counts {
            *freq.entry(c).or_insert(0) += 1;
        }
        let f = |k: u64| freq.get(&k).copied().unwrap_or(0) as f64;

        let mle = counts.iter().sum::<u64>() as f64 / n;

        let (first_len, first_second, first_third) = if f(0) > 0.0 {
            (
                -(f(0) / n).ln(),
                f(1) / f(0),
                (2.0 * f(2) / f(0)).sqrt(),
            )
        } else {
            (mle, mle, mle)
        };

        Self {
            mle,
            first_len,
            first_second,
            first_third,
        }
    }
}

/// A repertoire reconstructed from reads, an RCM and a centroid file, with
/// per-cluster error profiles.
pub struct RepertoireStats {
    clusters: Vec<ClusterStats>,
    min_size: usize,
}

impl RepertoireStats {
    /// Group the reads by their RCM cluster, attach declared centroids and
    /// compute every cluster profile. Profiles are independent, so they run
    /// across the rayon pool.
    pub fn from_files(
        reads_path: &Path,
        rcm_path: &Path,
        centroids_path: &Path,
        min_size: usize,
    ) -> Result<Self> {
        let reads = bio::read_sequence_file(reads_path)?;
        let rcm = parse_rcm(rcm_path)?;
        let centroids = bio::read_sequence_file(centroids_path)?;
        Ok(Self::build(reads, &rcm, &centroids, min_size))
    }

    /// In-memory variant of [`from_files`](Self::from_files).
    pub fn build(
        reads: Vec<Sequence>,
        rcm: &Rcm,
        centroids: &[Sequence],
        min_size: usize,
    ) -> Self {
        let mut by_id: HashMap<&str, &Sequence> = HashMap::new();
        for read in &reads {
            by_id.insert(read.id.as_str(), read);
        }

        let mut members: IndexMap<&str, Vec<Sequence>> = IndexMap::new();
        for (id, cluster) in rcm {
            if let (Some(cluster), Some(&read)) = (cluster, by_id.get(id.as_str())) {
                members.entry(cluster.as_str()).or_default().push(read.clone());
            }
        }

        let mut centers: HashMap<&str, (&Sequence, u64)> = HashMap::new();
        let mut parsed_names: Vec<(String, u64)> = Vec::with_capacity(centroids.len());
        for centroid in centroids {
            let (name, mult) = centroid
                .cluster_mult()
                .unwrap_or_else(|| (centroid.id.clone(), 1));
            parsed_names.push((name, mult));
        }
        for (centroid, (name, mult)) in centroids.iter().zip(&parsed_names) {
            centers.insert(name.as_str(), (centroid, *mult));
        }

        let clusters: Vec<ClusterStats> = members
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(name, cluster_reads)| {
                let center = centers.get(name);
                ClusterStats::compute(
                    name.to_string(),
                    cluster_reads,
                    center.map(|&(seq, _)| seq),
                    center.map(|&(_, mult)| mult),
                )
            })
            .collect();

        info!("profiled {} clusters", clusters.len());
        Self { clusters, min_size }
    }

    pub fn clusters(&self) -> &[ClusterStats] {
        &self.clusters
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Per-read error counts over clusters meeting the size threshold.
    pub fn nerrors_by_read(&self) -> Vec<u64> {
        self.clusters
            .iter()
            .filter(|c| c.size() >= self.min_size)
            .flat_map(|c| c.errors_by_read.iter().copied())
            .collect()
    }

    /// Normalized error positions over clusters meeting the size threshold.
    pub fn error_positions01(&self) -> Vec<f64> {
        self.clusters
            .iter()
            .filter(|c| c.size() >= self.min_size)
            .flat_map(|c| c.error_positions01())
            .collect()
    }

    pub fn error_rates(&self) -> ErrorRateEstimates {
        ErrorRateEstimates::from_error_counts(&self.nerrors_by_read())
    }

    /// The canonical repertoire error rate.
    pub fn error_rate(&self) -> f64 {
        self.error_rates().first_third
    }

    /// Clusters whose observed maximum per-position error is incompatible
    /// with the Poisson extremum null at rate `error_rate`.
    pub fn bad_cluster_ids(&self, error_rate: f64, pv_threshold: f64) -> Vec<String> {
        self.clusters
            .iter()
            .filter(|c| {
                c.size() >= self.min_size && c.pvalue_upper(error_rate) < pv_threshold
            })
            .map(|c| c.name.clone())
            .collect()
    }

    /// Export flagged clusters as FASTA files under `out_dir` and return
    /// their ids.
    pub fn export_bad_clusters(
        &self,
        error_rate: f64,
        pv_threshold: f64,
        out_dir: &Path,
        gzip: bool,
    ) -> Result<Vec<String>> {
        std::fs::create_dir_all(out_dir)?;
        let ext = if gzip { ".fa.gz" } else { ".fa" };

        let mut exported = Vec::new();
        for cluster in &self.clusters {
            let pv = cluster.pvalue_upper(error_rate);
            if cluster.size() >= self.min_size && pv < pv_threshold {
                let file = format!(
                    "bad_cluster__{}__size__{}__merrors__{}__pv_{:.5}{}",
                    cluster.name,
                    cluster.size(),
                    cluster.max_error,
                    pv,
                    ext
                );
                cluster.export(out_dir.join(file))?;
                exported.push(cluster.name.clone());
            }
        }
        Ok(exported)
    }
}
