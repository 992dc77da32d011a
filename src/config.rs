//! Evaluation settings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::meta::DEFAULT_MERGE_LIMIT;

pub const DEFAULT_CALCULATION_LIMIT: usize = 100;
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-3;

/// Limits and tolerances for one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Maximum recomputations of any single cell before the run stops.
    #[serde(default = "default_calculation_limit")]
    pub calculation_limit: usize,

    /// A sweep whose largest absolute change is below this has converged.
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    /// Cycle merges allowed while building the meta-graph.
    #[serde(default = "default_merge_limit")]
    pub merge_limit: usize,
}

fn default_calculation_limit() -> usize {
    DEFAULT_CALCULATION_LIMIT
}

fn default_convergence_threshold() -> f64 {
    DEFAULT_CONVERGENCE_THRESHOLD
}

fn default_merge_limit() -> usize {
    DEFAULT_MERGE_LIMIT
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            calculation_limit: DEFAULT_CALCULATION_LIMIT,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            merge_limit: DEFAULT_MERGE_LIMIT,
        }
    }
}

impl EvalConfig {
    pub fn new(calculation_limit: usize, convergence_threshold: f64) -> Self {
        Self {
            calculation_limit,
            convergence_threshold,
            ..Self::default()
        }
    }

    /// Loads settings from a TOML file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: EvalConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.calculation_limit == 0 {
            return Err(Error::InvalidConfig(
                "calculation_limit must be at least 1".to_string(),
            ));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "convergence_threshold must be a positive number, got {}",
                self.convergence_threshold
            )));
        }
        if self.merge_limit == 0 {
            return Err(Error::InvalidConfig(
                "merge_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
