//! Simulation output and serialization

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::simulation::metrics::MetricsSummary;
use crate::simulation::phases::PhaseReport;
use crate::spatial::grid::GridSnapshot;

/// Complete record of one run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub config: SimulationConfig,
    pub initial: MetricsSummary,
    pub final_metrics: MetricsSummary,
    pub relocation_phase: PhaseReport,
    pub swap_phase: PhaseReport,
    pub final_grid: GridSnapshot,
    pub statistics: SimulationStats,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationStats {
    pub simulation_time_ms: u64,
    pub total_rounds: usize,
    pub total_relocations: usize,
    pub total_long_jumps: usize,
    pub total_swaps: usize,
}

impl SimulationOutput {
    pub fn new(
        config: SimulationConfig,
        initial: MetricsSummary,
        final_metrics: MetricsSummary,
        relocation_phase: PhaseReport,
        swap_phase: PhaseReport,
        final_grid: GridSnapshot,
        elapsed: Duration,
    ) -> Self {
        let statistics = SimulationStats {
            simulation_time_ms: elapsed.as_millis() as u64,
            total_rounds: relocation_phase.rounds + swap_phase.rounds,
            total_relocations: relocation_phase.relocations + swap_phase.relocations,
            total_long_jumps: relocation_phase.long_jumps + swap_phase.long_jumps,
            total_swaps: swap_phase.swaps,
        };

        Self {
            config,
            initial,
            final_metrics,
            relocation_phase,
            swap_phase,
            final_grid,
            statistics,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Simulated {}x{} grid ({} agents, {} colors) in {}ms",
                self.config.width,
                self.config.height,
                self.final_metrics.agents,
                self.config.color_count,
                self.statistics.simulation_time_ms,
            ),
            format!(
                "Relocation phase: {} rounds, {} moves ({} long jumps){}",
                self.relocation_phase.rounds,
                self.relocation_phase.relocations,
                self.relocation_phase.long_jumps,
                phase_status(&self.relocation_phase),
            ),
            format!(
                "Swap phase: {} rounds, {} swaps, {} fallback moves{}",
                self.swap_phase.rounds,
                self.swap_phase.swaps,
                self.swap_phase.relocations,
                phase_status(&self.swap_phase),
            ),
            format!(
                "Mean similarity: {:.3} -> {:.3}",
                self.initial.mean_similarity, self.final_metrics.mean_similarity
            ),
            format!(
                "Unsatisfied agents: {} -> {}",
                self.initial.unsatisfied, self.final_metrics.unsatisfied
            ),
        ];
        lines.push(self.final_metrics.satisfaction_report());
        lines.join("\n")
    }
}

fn phase_status(report: &PhaseReport) -> String {
    let outcome = if report.converged {
        "converged"
    } else if report.halted.is_some() && report.aborted_rounds.last() == Some(&report.rounds) {
        "halted"
    } else {
        "budget exhausted"
    };
    match &report.halted {
        Some(reason) => format!(
            ", {} ({} aborted rounds, last: {})",
            outcome,
            report.aborted_rounds.len(),
            reason
        ),
        None => format!(", {}", outcome),
    }
}
