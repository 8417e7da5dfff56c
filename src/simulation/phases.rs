//! The two simulation phases
//!
//! Phase 1 relocates unsatisfied agents to nearby empty cells, judging each
//! agent live as the round goes. Phase 2 works from a per-round snapshot of
//! unsatisfied agents and pairs them up for swaps. The phases run one after
//! the other with separate budgets and stopping rules.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::ThresholdTable;
use crate::core::error::{Result, SchellingError};
use crate::core::types::Position;
use crate::simulation::movement::{relocate_nearest, swap_round, MoveKind, SwapTally};
use crate::simulation::satisfaction::{is_unsatisfied, unsatisfied_agents};
use crate::spatial::grid::OccupancyGrid;

/// What a phase did and why it stopped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Rounds started, including a round cut short by an error
    pub rounds: usize,
    /// Agents moved to an empty cell (phase 1 moves, phase 2 fallbacks)
    pub relocations: usize,
    /// Relocations that left the search neighborhood
    pub long_jumps: usize,
    /// Committed swaps
    pub swaps: usize,
    /// Changes committed in each round
    pub changes_per_round: Vec<usize>,
    /// Stopped on its own stopping rule rather than the round budget
    pub converged: bool,
    /// Rounds (1-based) cut short by a move with nowhere to go
    pub aborted_rounds: Vec<usize>,
    /// Reason the most recent aborted round gave
    pub halted: Option<String>,
}

impl PhaseReport {
    pub fn changes(&self) -> usize {
        self.relocations + self.swaps
    }
}

/// Phase 1: live relocation rounds
///
/// Each round walks the agents present at its start in row-major order. An
/// agent is judged when reached, so moves made earlier in the round count.
/// Stops after a round with no changes. A `NoVacancy` error aborts the round
/// and also ends the phase: the grid is full, so every later round would meet
/// the same agent first and fail the same way without drawing from `rng`.
/// Moves already made stand.
pub fn run_relocation_phase<R: Rng + ?Sized>(
    grid: &mut OccupancyGrid,
    thresholds: &ThresholdTable,
    radius: usize,
    max_rounds: usize,
    rng: &mut R,
) -> Result<PhaseReport> {
    let mut report = PhaseReport::default();

    for round in 0..max_rounds {
        report.rounds = round + 1;
        let agents: Vec<Position> = grid.occupied_positions().collect();
        let mut changes = 0;

        for p in agents {
            if !is_unsatisfied(grid, thresholds, p) {
                continue;
            }
            match relocate_nearest(grid, p, radius, rng) {
                Ok(moved) => {
                    changes += 1;
                    report.relocations += 1;
                    if moved.kind == MoveKind::LongJump {
                        report.long_jumps += 1;
                    }
                }
                Err(err @ SchellingError::NoVacancy { .. }) => {
                    tracing::warn!("Relocation round {} aborted: {}", round + 1, err);
                    report.changes_per_round.push(changes);
                    report.aborted_rounds.push(round + 1);
                    report.halted = Some(err.to_string());
                    return Ok(report);
                }
                Err(err) => return Err(err),
            }
        }

        report.changes_per_round.push(changes);
        tracing::debug!("Relocation round {}: {} moves", round + 1, changes);

        if changes == 0 {
            report.converged = true;
            tracing::info!(
                "Relocation phase stopping early after {} rounds, no agent moved",
                round + 1
            );
            break;
        }
    }

    if !report.converged {
        tracing::info!(
            "Relocation phase used its budget of {} rounds ({} moves)",
            max_rounds,
            report.relocations
        );
    }
    Ok(report)
}

/// Phase 2: snapshot swap rounds
///
/// Each round snapshots the unsatisfied agents before touching the grid,
/// shuffles them and runs one swap-matching pass. Stops after a round that
/// made no swaps with an empty snapshot. `NoVacancy` from a fallback move
/// aborts only the current round; the next round reshuffles a fresh snapshot
/// and may still find swaps before it reaches an agent with no partner.
pub fn run_swap_phase<R: Rng + ?Sized>(
    grid: &mut OccupancyGrid,
    thresholds: &ThresholdTable,
    max_rounds: usize,
    parallel_threshold: usize,
    rng: &mut R,
) -> Result<PhaseReport> {
    let mut report = PhaseReport::default();

    for round in 0..max_rounds {
        report.rounds = round + 1;
        let mut snapshot = unsatisfied_agents(grid, thresholds, parallel_threshold);
        snapshot.shuffle(rng);

        let mut tally = SwapTally::default();
        let outcome = swap_round(grid, thresholds, &snapshot, rng, &mut tally);

        report.swaps += tally.swaps;
        report.relocations += tally.fallback_relocations;
        report.long_jumps += tally.fallback_relocations;
        report.changes_per_round.push(tally.swaps + tally.fallback_relocations);

        match outcome {
            Ok(()) => {}
            Err(err @ SchellingError::NoVacancy { .. }) => {
                tracing::warn!("Swap round {} aborted: {}", round + 1, err);
                report.aborted_rounds.push(round + 1);
                report.halted = Some(err.to_string());
            }
            Err(err) => return Err(err),
        }

        tracing::debug!(
            "Swap round {}: {} unsatisfied, {} swaps, {} fallback moves",
            round + 1,
            snapshot.len(),
            tally.swaps,
            tally.fallback_relocations
        );

        if tally.swaps == 0 && snapshot.is_empty() {
            report.converged = true;
            tracing::info!(
                "Swap phase stopping early after {} rounds, all agents satisfied",
                round + 1
            );
            break;
        }
    }

    tracing::info!(
        "Swap phase completed with {} swaps ({} rounds aborted)",
        report.swaps,
        report.aborted_rounds.len()
    );
    Ok(report)
}
