//! Threshold sweep: how segregated does the grid end up as tolerance drops?
//!
//! Runs the same scenario once per uniform threshold. Runs are independent,
//! each with its own generator seeded from the scenario, so they go on the
//! rayon pool and the result order follows the input order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::config::{SimulationConfig, ThresholdSpec};
use crate::core::error::Result;
use crate::simulation::simulate;

/// Outcome of one run in a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub threshold: f64,
    pub initial_mean_similarity: f64,
    pub final_mean_similarity: f64,
    pub final_unsatisfied: usize,
    pub swaps: usize,
    pub relocations: usize,
}

/// Default thresholds studied: 0.0 to 0.7 in steps of 0.1
pub fn default_thresholds() -> Vec<f64> {
    (0..=7).map(|i| f64::from(i) / 10.0).collect()
}

pub fn threshold_sweep(base: &SimulationConfig, thresholds: &[f64]) -> Result<Vec<SweepPoint>> {
    thresholds
        .par_iter()
        .map(|&threshold| -> Result<SweepPoint> {
            let config = SimulationConfig {
                thresholds: ThresholdSpec::Uniform(threshold),
                ..base.clone()
            };
            let output = simulate(config)?;
            tracing::debug!(
                "Sweep threshold {:.2}: mean similarity {:.3}",
                threshold,
                output.final_metrics.mean_similarity
            );
            Ok(SweepPoint {
                threshold,
                initial_mean_similarity: output.initial.mean_similarity,
                final_mean_similarity: output.final_metrics.mean_similarity,
                final_unsatisfied: output.final_metrics.unsatisfied,
                swaps: output.statistics.total_swaps,
                relocations: output.statistics.total_relocations,
            })
        })
        .collect()
}
