//! Evaluation parameters with file-based overrides.

use crate::reconstruct::DEFAULT_TAUS;
use crate::{RepquastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Largest edit distance considered a match.
    pub tau_max: u32,
    /// Size threshold for reported measures and intrinsic statistics.
    pub min_size: u64,
    /// Reference abundances at or above this are trusted unconditionally.
    pub trust_cutoff: Option<u64>,
    /// Reference abundances below this are ignored in the match grids.
    pub trash_cutoff: Option<u64>,
    /// Upper p-value below which a cluster is flagged.
    pub pv_threshold: f64,
    /// Widening schedule for RCM reconstruction.
    pub reconstruction_taus: Vec<u32>,
    /// Finish reconstruction with an unbounded matching round.
    pub exhaustive_fallback: bool,
    /// Tie-breaking seed for reconstruction.
    pub rng_seed: u64,
    /// Worker threads; 0 means all cores.
    pub threads: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            tau_max: 4,
            min_size: 5,
            trust_cutoff: None,
            trash_cutoff: None,
            pv_threshold: 0.01,
            reconstruction_taus: DEFAULT_TAUS.to_vec(),
            exhaustive_fallback: false,
            rng_seed: 0,
            threads: 0,
        }
    }
}

impl EvaluationConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RepquastError::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(trash), Some(trust)) = (self.trash_cutoff, self.trust_cutoff) {
            if trash > trust {
                return Err(RepquastError::Precondition(format!(
                    "trash cutoff {trash} exceeds trust cutoff {trust}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.pv_threshold) {
            return Err(RepquastError::Precondition(format!(
                "p-value threshold {} outside [0, 1]",
                self.pv_threshold
            )));
        }
        if self.min_size == 0 {
            return Err(RepquastError::Precondition(
                "min_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Size threshold used in the report: the trust cutoff when one was
    /// given, the configured minimum otherwise.
    pub fn report_min_size(&self) -> u64 {
        self.trust_cutoff.unwrap_or(self.min_size)
    }
}
