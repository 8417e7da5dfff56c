//! Relocation and swap moves
//!
//! Every function takes the generator explicitly; nothing here draws from a
//! global source. All grid changes go through the grid's atomic primitives.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::ThresholdTable;
use crate::core::error::{Result, SchellingError};
use crate::core::types::{Color, Position};
use crate::simulation::satisfaction::is_unsatisfied;
use crate::spatial::grid::OccupancyGrid;

/// How an agent found its new cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    /// Empty cell inside the search radius
    Neighborhood,
    /// Uniform draw from the whole empty set
    LongJump,
}

/// A committed relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: Position,
    pub to: Position,
    pub kind: MoveKind,
}

fn occupant(grid: &OccupancyGrid, p: Position) -> Result<Color> {
    grid.color_at(p)
        .ok_or_else(|| SchellingError::invariant(p, "no agent to move"))
}

/// Move the agent on `p` to an empty cell within `radius`, or anywhere
///
/// Neighbors are scanned in shuffled order and the first empty one wins. With
/// no empty neighbor the agent takes a long jump to a uniformly random empty
/// cell. Fails with `NoVacancy` before drawing anything when the grid is full.
pub fn relocate_nearest<R: Rng + ?Sized>(
    grid: &mut OccupancyGrid,
    p: Position,
    radius: usize,
    rng: &mut R,
) -> Result<Relocation> {
    let color = occupant(grid, p)?;
    if grid.empty_count() == 0 {
        return Err(SchellingError::NoVacancy { position: p, color });
    }

    let mut candidates: Vec<Position> = grid.neighbors(p, radius).collect();
    candidates.shuffle(rng);

    let nearby = candidates.into_iter().find(|&q| grid.is_empty(q));
    if let Some(to) = nearby {
        grid.relocate(p, to)?;
        return Ok(Relocation {
            from: p,
            to,
            kind: MoveKind::Neighborhood,
        });
    }

    long_jump(grid, p, rng)
}

/// Move the agent on `p` to a uniformly random empty cell
pub fn long_jump<R: Rng + ?Sized>(
    grid: &mut OccupancyGrid,
    p: Position,
    rng: &mut R,
) -> Result<Relocation> {
    let color = occupant(grid, p)?;
    let to = grid
        .random_empty(rng)
        .ok_or(SchellingError::NoVacancy { position: p, color })?;
    grid.relocate(p, to)?;
    Ok(Relocation {
        from: p,
        to,
        kind: MoveKind::LongJump,
    })
}

/// Trial swap: would exchanging `a` and `b` leave both agents satisfied?
///
/// The grid is swapped, both cells are judged, and the swap is undone before
/// returning. Two agents of the same color qualify only when both are already
/// satisfied, since their swap leaves the grid as it is.
pub fn can_swap(
    grid: &mut OccupancyGrid,
    thresholds: &ThresholdTable,
    a: Position,
    b: Position,
) -> Result<bool> {
    if a == b {
        return Ok(false);
    }
    occupant(grid, a)?;
    occupant(grid, b)?;

    grid.swap(a, b)?;
    let both_satisfied =
        !is_unsatisfied(grid, thresholds, a) && !is_unsatisfied(grid, thresholds, b);
    grid.swap(a, b)?;

    Ok(both_satisfied)
}

/// Counts from one swap-matching pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapTally {
    pub swaps: usize,
    pub fallback_relocations: usize,
    /// Agents whose match search failed but who were satisfied by the time
    /// their fallback came up
    pub settled_without_move: usize,
}

/// One swap-matching pass over a shuffled snapshot of unsatisfied agents
///
/// Each unresolved agent takes the first unresolved partner (in snapshot
/// order) for which [`can_swap`] holds; both are then resolved. An agent with
/// no partner is resolved too, and takes a long jump if it is still
/// unsatisfied. Counts accumulate into `tally` as moves commit, so they stay
/// accurate when the pass stops on an error.
pub fn swap_round<R: Rng + ?Sized>(
    grid: &mut OccupancyGrid,
    thresholds: &ThresholdTable,
    snapshot: &[Position],
    rng: &mut R,
    tally: &mut SwapTally,
) -> Result<()> {
    let mut resolved = vec![false; snapshot.len()];

    for i in 0..snapshot.len() {
        if resolved[i] {
            continue;
        }
        let a = snapshot[i];

        let mut partner = None;
        for (j, &b) in snapshot.iter().enumerate() {
            if j == i || resolved[j] {
                continue;
            }
            if can_swap(grid, thresholds, a, b)? {
                partner = Some(j);
                break;
            }
        }

        resolved[i] = true;
        match partner {
            Some(j) => {
                grid.swap(a, snapshot[j])?;
                resolved[j] = true;
                tally.swaps += 1;
            }
            None if is_unsatisfied(grid, thresholds, a) => {
                long_jump(grid, a, rng)?;
                tally.fallback_relocations += 1;
            }
            None => tally.settled_without_move += 1,
        }
    }

    Ok(())
}
