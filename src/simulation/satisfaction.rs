//! Agent satisfaction
//!
//! Pure reads over the grid. An agent looks at the occupied cells of its Moore
//! neighborhood and compares the share of like-colored ones with the threshold
//! for its color. Agents with no occupied neighbors are always satisfied.

use rayon::prelude::*;

use crate::core::config::ThresholdTable;
use crate::core::types::Position;
use crate::spatial::grid::OccupancyGrid;

/// Radius used to judge satisfaction, independent of the phase-1 search radius
pub const SATISFACTION_RADIUS: usize = 1;

/// Occupied neighbors of an agent, split by whether they share its color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborCounts {
    pub similar: usize,
    pub different: usize,
}

impl NeighborCounts {
    pub fn total(&self) -> usize {
        self.similar + self.different
    }

    /// `similar / total`, or `None` when there are no occupied neighbors
    pub fn ratio(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.similar as f64 / total as f64),
        }
    }
}

/// Neighbor tally for the agent on `p`; `None` if `p` holds no agent
pub fn neighbor_counts(grid: &OccupancyGrid, p: Position) -> Option<NeighborCounts> {
    let color = grid.color_at(p)?;
    let mut counts = NeighborCounts::default();
    for q in grid.neighbors(p, SATISFACTION_RADIUS) {
        match grid.color_at(q) {
            Some(other) if other == color => counts.similar += 1,
            Some(_) => counts.different += 1,
            None => {}
        }
    }
    Some(counts)
}

/// Whether the agent on `p` wants to move
///
/// Empty cells and isolated agents are never unsatisfied. Colors without a
/// threshold entry never are either; `Simulation` rejects such grids up front.
pub fn is_unsatisfied(grid: &OccupancyGrid, thresholds: &ThresholdTable, p: Position) -> bool {
    let Some(color) = grid.color_at(p) else {
        return false;
    };
    let Some(threshold) = thresholds.get(color) else {
        return false;
    };
    match neighbor_counts(grid, p).and_then(|counts| counts.ratio()) {
        Some(ratio) => ratio < threshold,
        None => false,
    }
}

/// Share of like-colored occupied neighbors, 1.0 when isolated
///
/// `None` if `p` holds no agent.
pub fn similarity_ratio(grid: &OccupancyGrid, p: Position) -> Option<f64> {
    neighbor_counts(grid, p).map(|counts| counts.ratio().unwrap_or(1.0))
}

/// Row-major list of every unsatisfied agent at this moment
///
/// Runs on the rayon pool once the agent count reaches `parallel_threshold`;
/// the result is the same either way.
pub fn unsatisfied_agents(
    grid: &OccupancyGrid,
    thresholds: &ThresholdTable,
    parallel_threshold: usize,
) -> Vec<Position> {
    let agents: Vec<Position> = grid.occupied_positions().collect();
    if agents.len() >= parallel_threshold {
        agents
            .into_par_iter()
            .filter(|&p| is_unsatisfied(grid, thresholds, p))
            .collect()
    } else {
        agents
            .into_iter()
            .filter(|&p| is_unsatisfied(grid, thresholds, p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Color;

    fn c(n: u16) -> Option<Color> {
        Some(Color(n))
    }

    #[test]
    fn test_isolated_agent_is_satisfied() {
        let grid = OccupancyGrid::from_cells(2, 1, vec![c(1), None]).unwrap();
        let strict = ThresholdTable::uniform(1, 1.0).unwrap();
        let p = Position::new(0, 0);
        assert!(!is_unsatisfied(&grid, &strict, p));
        assert_eq!(similarity_ratio(&grid, p), Some(1.0));
        assert_eq!(neighbor_counts(&grid, p).unwrap().total(), 0);
    }

    #[test]
    fn test_minority_agent_in_a_row() {
        let grid = OccupancyGrid::from_cells(3, 1, vec![c(1), c(2), c(1)]).unwrap();
        let thresholds = ThresholdTable::uniform(2, 1.0).unwrap();
        let middle = Position::new(1, 0);
        let counts = neighbor_counts(&grid, middle).unwrap();
        assert_eq!(counts, NeighborCounts { similar: 0, different: 2 });
        assert_eq!(similarity_ratio(&grid, middle), Some(0.0));
        assert!(is_unsatisfied(&grid, &thresholds, middle));
    }

    #[test]
    fn test_ratio_equal_to_threshold_is_satisfied() {
        // Center has 2 similar and 2 different occupied neighbors
        let grid = OccupancyGrid::from_cells(
            3,
            3,
            vec![c(1), None, c(2), None, c(1), None, c(1), None, c(2)],
        )
        .unwrap();
        let center = Position::new(1, 1);
        assert_eq!(similarity_ratio(&grid, center), Some(0.5));
        let at = ThresholdTable::uniform(2, 0.5).unwrap();
        let above = ThresholdTable::uniform(2, 0.51).unwrap();
        assert!(!is_unsatisfied(&grid, &at, center));
        assert!(is_unsatisfied(&grid, &above, center));
    }

    #[test]
    fn test_empty_cells_are_not_agents() {
        let grid = OccupancyGrid::from_cells(2, 1, vec![c(1), None]).unwrap();
        let thresholds = ThresholdTable::uniform(1, 1.0).unwrap();
        let empty = Position::new(1, 0);
        assert!(!is_unsatisfied(&grid, &thresholds, empty));
        assert_eq!(similarity_ratio(&grid, empty), None);
    }

    #[test]
    fn test_zero_threshold_never_unsatisfied() {
        let grid = OccupancyGrid::from_cells(3, 1, vec![c(1), c(2), c(1)]).unwrap();
        let thresholds = ThresholdTable::uniform(2, 0.0).unwrap();
        assert!(unsatisfied_agents(&grid, &thresholds, usize::MAX).is_empty());
    }

    #[test]
    fn test_parallel_and_sequential_scans_agree() {
        let grid = OccupancyGrid::from_cells(
            4,
            2,
            vec![c(1), c(2), c(1), c(2), c(2), c(1), None, c(1)],
        )
        .unwrap();
        let thresholds = ThresholdTable::uniform(2, 0.6).unwrap();
        let sequential = unsatisfied_agents(&grid, &thresholds, usize::MAX);
        let parallel = unsatisfied_agents(&grid, &thresholds, 0);
        assert_eq!(sequential, parallel);
        assert!(!sequential.is_empty());
    }
}
