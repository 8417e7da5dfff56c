//! Aggregate statistics over a grid state
//!
//! Read-only. Per-agent ratios may be computed on the rayon pool, but sums are
//! always taken sequentially in row-major order so results never depend on
//! thread scheduling.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::config::ThresholdTable;
use crate::core::types::{Color, Position};
use crate::simulation::satisfaction::{similarity_ratio, unsatisfied_agents};
use crate::spatial::grid::OccupancyGrid;

/// `(color, similarity ratio)` for every agent, row-major
fn agent_ratios(grid: &OccupancyGrid, parallel_threshold: usize) -> Vec<(Color, f64)> {
    let agents: Vec<(Position, Color)> = grid.occupants().collect();
    let ratio = |&(p, color): &(Position, Color)| (color, similarity_ratio(grid, p).unwrap_or(1.0));
    if agents.len() >= parallel_threshold {
        agents.par_iter().map(ratio).collect()
    } else {
        agents.iter().map(ratio).collect()
    }
}

/// Mean similarity ratio over all agents; 1.0 for a grid with no agents
pub fn mean_similarity(grid: &OccupancyGrid, parallel_threshold: usize) -> f64 {
    let ratios = agent_ratios(grid, parallel_threshold);
    if ratios.is_empty() {
        return 1.0;
    }
    ratios.iter().map(|(_, r)| r).sum::<f64>() / ratios.len() as f64
}

/// Percentage (0-100) of each color's agents whose similarity ratio meets
/// or exceeds that color's threshold; 0.0 for a color with no agents
pub fn satisfaction_by_color(
    grid: &OccupancyGrid,
    thresholds: &ThresholdTable,
    parallel_threshold: usize,
) -> BTreeMap<Color, f64> {
    let mut tally: BTreeMap<Color, (usize, usize)> =
        thresholds.colors().map(|color| (color, (0, 0))).collect();

    for (color, ratio) in agent_ratios(grid, parallel_threshold) {
        let Some(threshold) = thresholds.get(color) else {
            continue;
        };
        if let Some((met, total)) = tally.get_mut(&color) {
            *total += 1;
            if ratio >= threshold {
                *met += 1;
            }
        }
    }

    tally
        .into_iter()
        .map(|(color, (met, total))| {
            let pct = if total == 0 {
                0.0
            } else {
                met as f64 / total as f64 * 100.0
            };
            (color, pct)
        })
        .collect()
}

/// Mean similarity ratio of each color's agents; 1.0 for a color with no agents
pub fn similarity_by_color(
    grid: &OccupancyGrid,
    thresholds: &ThresholdTable,
    parallel_threshold: usize,
) -> BTreeMap<Color, f64> {
    let mut sums: BTreeMap<Color, (f64, usize)> =
        thresholds.colors().map(|color| (color, (0.0, 0))).collect();

    for (color, ratio) in agent_ratios(grid, parallel_threshold) {
        let entry = sums.entry(color).or_insert((0.0, 0));
        entry.0 += ratio;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(color, (sum, n))| (color, if n == 0 { 1.0 } else { sum / n as f64 }))
        .collect()
}

/// Snapshot of every reported statistic for one grid state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub agents: usize,
    pub empty_cells: usize,
    pub unsatisfied: usize,
    pub mean_similarity: f64,
    pub color_counts: BTreeMap<Color, usize>,
    pub satisfaction_by_color: BTreeMap<Color, f64>,
    pub similarity_by_color: BTreeMap<Color, f64>,
}

impl MetricsSummary {
    pub fn collect(
        grid: &OccupancyGrid,
        thresholds: &ThresholdTable,
        parallel_threshold: usize,
    ) -> Self {
        Self {
            agents: grid.occupied_count(),
            empty_cells: grid.empty_count(),
            unsatisfied: unsatisfied_agents(grid, thresholds, parallel_threshold).len(),
            mean_similarity: mean_similarity(grid, parallel_threshold),
            color_counts: grid.color_counts(),
            satisfaction_by_color: satisfaction_by_color(grid, thresholds, parallel_threshold),
            similarity_by_color: similarity_by_color(grid, thresholds, parallel_threshold),
        }
    }

    /// One line per color, e.g. `Agent type 1: 85.00% meet or exceed the similarity threshold`
    pub fn satisfaction_report(&self) -> String {
        self.satisfaction_by_color
            .iter()
            .map(|(color, pct)| {
                format!(
                    "Agent type {}: {:.2}% meet or exceed the similarity threshold",
                    color, pct
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
