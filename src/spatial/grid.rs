//! Occupancy grid: which cell holds which color, and which cells are empty
//!
//! The occupied cells and the empty set are kept in one structure and only
//! change through [`OccupancyGrid::place`], [`OccupancyGrid::vacate`],
//! [`OccupancyGrid::relocate`] and [`OccupancyGrid::swap`]. Each of those checks
//! its preconditions before touching anything, so a failed call leaves the grid
//! exactly as it was.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SchellingError};
use crate::core::types::{Color, Position};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    /// Row-major, `y * width + x`
    cells: Vec<Option<Color>>,
    /// Every empty position, in no particular order
    empty: Vec<Position>,
    /// For each cell, its index in `empty` when the cell is empty
    empty_slot: Vec<Option<usize>>,
}

impl OccupancyGrid {
    /// A grid with every cell empty
    pub fn new(width: usize, height: usize) -> Self {
        let mut empty = Vec::with_capacity(width * height);
        let mut empty_slot = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                empty_slot.push(Some(empty.len()));
                empty.push(Position::new(x, y));
            }
        }
        Self {
            width,
            height,
            cells: vec![None; width * height],
            empty,
            empty_slot,
        }
    }

    /// Build a grid from an explicit row-major layout
    pub fn from_cells(width: usize, height: usize, cells: Vec<Option<Color>>) -> Result<Self> {
        if cells.len() != width * height {
            return Err(SchellingError::ConfigError(format!(
                "layout has {} cells but a {}x{} grid needs {}",
                cells.len(),
                width,
                height,
                width * height
            )));
        }
        let mut grid = Self::new(width, height);
        for (index, cell) in cells.into_iter().enumerate() {
            if let Some(color) = cell {
                grid.place(grid.position_of(index), color)?;
            }
        }
        Ok(grid)
    }

    /// Rebuild a grid from an exported snapshot
    pub fn from_snapshot(snapshot: &GridSnapshot) -> Result<Self> {
        let mut grid = Self::new(snapshot.width, snapshot.height);
        if snapshot.cells.len() != grid.cells.len() {
            return Err(SchellingError::ConfigError(format!(
                "snapshot lists {} cells for a {}x{} grid",
                snapshot.cells.len(),
                snapshot.width,
                snapshot.height
            )));
        }
        for &(position, color) in &snapshot.cells {
            if let Some(color) = color {
                grid.place(position, color)?;
            }
        }
        Ok(grid)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn contains(&self, p: Position) -> bool {
        p.x < self.width && p.y < self.height
    }

    #[inline]
    fn index_of(&self, p: Position) -> Option<usize> {
        self.contains(p).then(|| p.y * self.width + p.x)
    }

    #[inline]
    fn position_of(&self, index: usize) -> Position {
        Position::new(index % self.width, index / self.width)
    }

    fn checked_index(&self, p: Position) -> Result<usize> {
        self.index_of(p)
            .ok_or_else(|| SchellingError::invariant(p, "position outside the grid"))
    }

    /// True only for an in-bounds cell with no occupant
    #[inline]
    pub fn is_empty(&self, p: Position) -> bool {
        self.index_of(p)
            .map(|index| self.cells[index].is_none())
            .unwrap_or(false)
    }

    /// Occupant color, `None` for empty or out-of-bounds cells
    #[inline]
    pub fn color_at(&self, p: Position) -> Option<Color> {
        self.index_of(p).and_then(|index| self.cells[index])
    }

    /// Positions within Chebyshev distance `radius` of `p`, excluding `p`,
    /// clipped to the grid (no wraparound), in row-major order
    pub fn neighbors(&self, p: Position, radius: usize) -> impl Iterator<Item = Position> {
        // An empty range when `p` lies off the grid
        let (x_min, x_max) = (p.x.saturating_sub(radius), p.x.saturating_add(radius));
        let (y_min, y_max) = (p.y.saturating_sub(radius), p.y.saturating_add(radius));
        let x_max = x_max.min(self.width.saturating_sub(1));
        let y_max = y_max.min(self.height.saturating_sub(1));
        let in_bounds = self.contains(p);

        (y_min..=y_max)
            .filter(move |_| in_bounds)
            .flat_map(move |y| (x_min..=x_max).map(move |x| Position::new(x, y)))
            .filter(move |&q| q != p)
    }

    /// Put an agent of `color` on an empty cell
    pub fn place(&mut self, p: Position, color: Color) -> Result<()> {
        let index = self.checked_index(p)?;
        if self.cells[index].is_some() {
            return Err(SchellingError::invariant(p, "place on an occupied cell"));
        }
        self.take_from_empty(index);
        self.cells[index] = Some(color);
        Ok(())
    }

    /// Remove the agent on `p`, returning its color
    pub fn vacate(&mut self, p: Position) -> Result<Color> {
        let index = self.checked_index(p)?;
        let color = self.cells[index]
            .take()
            .ok_or_else(|| SchellingError::invariant(p, "vacate on an empty cell"))?;
        self.give_to_empty(index);
        Ok(color)
    }

    /// Move the agent on `from` to the empty cell `to`
    pub fn relocate(&mut self, from: Position, to: Position) -> Result<()> {
        let from_index = self.checked_index(from)?;
        let to_index = self.checked_index(to)?;
        if self.cells[from_index].is_none() {
            return Err(SchellingError::invariant(from, "relocate from an empty cell"));
        }
        if self.cells[to_index].is_some() {
            return Err(SchellingError::invariant(to, "relocate onto an occupied cell"));
        }

        let color = self.vacate(from)?;
        self.place(to, color)
    }

    /// Exchange the colors on two occupied cells; the empty set is untouched
    pub fn swap(&mut self, a: Position, b: Position) -> Result<()> {
        let a_index = self.checked_index(a)?;
        let b_index = self.checked_index(b)?;
        if self.cells[a_index].is_none() {
            return Err(SchellingError::invariant(a, "swap with an empty cell"));
        }
        if self.cells[b_index].is_none() {
            return Err(SchellingError::invariant(b, "swap with an empty cell"));
        }
        self.cells.swap(a_index, b_index);
        Ok(())
    }

    fn take_from_empty(&mut self, index: usize) {
        if let Some(slot) = self.empty_slot[index].take() {
            self.empty.swap_remove(slot);
            if let Some(moved) = self.empty.get(slot).copied() {
                let moved_index = moved.y * self.width + moved.x;
                self.empty_slot[moved_index] = Some(slot);
            }
        }
    }

    fn give_to_empty(&mut self, index: usize) {
        self.empty_slot[index] = Some(self.empty.len());
        self.empty.push(self.position_of(index));
    }

    pub fn empty_count(&self) -> usize {
        self.empty.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.len() - self.empty.len()
    }

    /// The empty set, in its internal (unordered) layout
    pub fn empty_positions(&self) -> &[Position] {
        &self.empty
    }

    /// Uniformly random empty cell
    pub fn random_empty<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        self.empty.choose(rng).copied()
    }

    /// Occupied cells with their colors, row-major
    pub fn occupants(&self) -> impl Iterator<Item = (Position, Color)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| cell.map(|color| (self.position_of(index), color)))
    }

    /// Occupied positions, row-major
    pub fn occupied_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.occupants().map(|(position, _)| position)
    }

    /// Number of agents of each color present on the grid
    pub fn color_counts(&self) -> BTreeMap<Color, usize> {
        let mut counts = BTreeMap::new();
        for (_, color) in self.occupants() {
            *counts.entry(color).or_insert(0) += 1;
        }
        counts
    }

    /// Verify that occupied and empty cells partition the grid and that the
    /// empty-set index agrees with the cells
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen_empty = 0;
        for (index, cell) in self.cells.iter().enumerate() {
            let position = self.position_of(index);
            match (cell, self.empty_slot[index]) {
                (Some(_), None) => {}
                (None, Some(slot)) => {
                    if self.empty.get(slot) != Some(&position) {
                        return Err(SchellingError::invariant(
                            position,
                            "empty-set index points at another cell",
                        ));
                    }
                    seen_empty += 1;
                }
                (Some(_), Some(_)) => {
                    return Err(SchellingError::invariant(
                        position,
                        "cell is both occupied and empty",
                    ));
                }
                (None, None) => {
                    return Err(SchellingError::invariant(
                        position,
                        "cell is neither occupied nor empty",
                    ));
                }
            }
        }
        if seen_empty != self.empty.len() {
            return Err(SchellingError::invariant(
                Position::new(0, 0),
                format!(
                    "empty set holds {} entries but {} cells are empty",
                    self.empty.len(),
                    seen_empty
                ),
            ));
        }
        Ok(())
    }

    /// Read-only row-major export of every cell
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.width,
            height: self.height,
            cells: self
                .cells
                .iter()
                .enumerate()
                .map(|(index, &cell)| (self.position_of(index), cell))
                .collect(),
        }
    }
}

/// Row-major list of every cell and its occupant, detached from the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<(Position, Option<Color>)>,
}

impl GridSnapshot {
    /// One text row per grid row, `.` for empty cells
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.cells.chunks(self.width.max(1)) {
            out.extend(row.iter().map(|(_, cell)| cell.map_or('.', Color::glyph)));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn c(n: u16) -> Option<Color> {
        Some(Color(n))
    }

    #[test]
    fn test_new_grid_is_all_empty() {
        let grid = OccupancyGrid::new(4, 3);
        assert_eq!(grid.cell_count(), 12);
        assert_eq!(grid.empty_count(), 12);
        assert_eq!(grid.occupied_count(), 0);
        assert!(grid.check_invariants().is_ok());
    }

    #[test]
    fn test_moore_neighborhood_sizes() {
        let grid = OccupancyGrid::new(5, 5);
        assert_eq!(grid.neighbors(Position::new(2, 2), 1).count(), 8);
        assert_eq!(grid.neighbors(Position::new(0, 0), 1).count(), 3);
        assert_eq!(grid.neighbors(Position::new(4, 0), 1).count(), 3);
        assert_eq!(grid.neighbors(Position::new(0, 2), 1).count(), 5);
        assert_eq!(grid.neighbors(Position::new(2, 2), 2).count(), 24);
        assert_eq!(grid.neighbors(Position::new(0, 0), 2).count(), 8);
    }

    #[test]
    fn test_neighbors_exclude_center_and_stay_in_range() {
        let grid = OccupancyGrid::new(6, 4);
        let center = Position::new(1, 3);
        for radius in 1..4 {
            for q in grid.neighbors(center, radius) {
                assert_ne!(q, center);
                assert!(grid.contains(q));
                assert!(center.chebyshev(&q) <= radius);
            }
        }
    }

    #[test]
    fn test_neighbors_of_outside_position_is_empty() {
        let grid = OccupancyGrid::new(3, 3);
        assert_eq!(grid.neighbors(Position::new(7, 7), 1).count(), 0);
    }

    #[test]
    fn test_single_row_neighbors() {
        let grid = OccupancyGrid::new(3, 1);
        let around: Vec<_> = grid.neighbors(Position::new(1, 0), 1).collect();
        assert_eq!(around, vec![Position::new(0, 0), Position::new(2, 0)]);
    }

    #[test]
    fn test_place_and_vacate() {
        let mut grid = OccupancyGrid::new(2, 2);
        let p = Position::new(1, 0);
        grid.place(p, Color(2)).unwrap();
        assert!(!grid.is_empty(p));
        assert_eq!(grid.color_at(p), Some(Color(2)));
        assert_eq!(grid.empty_count(), 3);
        assert!(grid.check_invariants().is_ok());

        assert_eq!(grid.vacate(p).unwrap(), Color(2));
        assert!(grid.is_empty(p));
        assert_eq!(grid.empty_count(), 4);
        assert!(grid.check_invariants().is_ok());
    }

    #[test]
    fn test_place_on_occupied_is_invariant_violation() {
        let mut grid = OccupancyGrid::new(2, 1);
        grid.place(Position::new(0, 0), Color(1)).unwrap();
        let before = grid.clone();
        let err = grid.place(Position::new(0, 0), Color(2)).unwrap_err();
        assert!(matches!(err, SchellingError::InvariantViolation { .. }));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_vacate_empty_is_invariant_violation() {
        let mut grid = OccupancyGrid::new(2, 1);
        let err = grid.vacate(Position::new(1, 0)).unwrap_err();
        assert!(matches!(err, SchellingError::InvariantViolation { .. }));
        assert!(grid.check_invariants().is_ok());
    }

    #[test]
    fn test_out_of_bounds_is_invariant_violation() {
        let mut grid = OccupancyGrid::new(2, 2);
        assert!(matches!(
            grid.place(Position::new(2, 0), Color(1)),
            Err(SchellingError::InvariantViolation { .. })
        ));
        assert!(!grid.is_empty(Position::new(2, 0)));
        assert_eq!(grid.color_at(Position::new(0, 5)), None);
    }

    #[test]
    fn test_relocate_moves_agent_atomically() {
        let mut grid = OccupancyGrid::from_cells(3, 1, vec![c(1), None, c(2)]).unwrap();
        grid.relocate(Position::new(0, 0), Position::new(1, 0)).unwrap();
        assert_eq!(grid.color_at(Position::new(1, 0)), Some(Color(1)));
        assert!(grid.is_empty(Position::new(0, 0)));
        assert!(grid.check_invariants().is_ok());

        let before = grid.clone();
        assert!(grid.relocate(Position::new(1, 0), Position::new(2, 0)).is_err());
        assert!(grid.relocate(Position::new(0, 0), Position::new(2, 0)).is_err());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_swap_exchanges_colors_only() {
        let mut grid = OccupancyGrid::from_cells(3, 1, vec![c(1), None, c(2)]).unwrap();
        let empty_before = grid.empty_positions().to_vec();
        grid.swap(Position::new(0, 0), Position::new(2, 0)).unwrap();
        assert_eq!(grid.color_at(Position::new(0, 0)), Some(Color(2)));
        assert_eq!(grid.color_at(Position::new(2, 0)), Some(Color(1)));
        assert_eq!(grid.empty_positions(), empty_before.as_slice());

        let before = grid.clone();
        assert!(grid.swap(Position::new(0, 0), Position::new(1, 0)).is_err());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_color_counts() {
        let grid = OccupancyGrid::from_cells(2, 2, vec![c(1), c(2), c(1), None]).unwrap();
        let counts = grid.color_counts();
        assert_eq!(counts.get(&Color(1)), Some(&2));
        assert_eq!(counts.get(&Color(2)), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_from_cells_rejects_wrong_length() {
        assert!(matches!(
            OccupancyGrid::from_cells(2, 2, vec![c(1)]),
            Err(SchellingError::ConfigError(_))
        ));
    }

    #[test]
    fn test_random_empty_only_returns_empty_cells() {
        let grid = OccupancyGrid::from_cells(3, 2, vec![c(1), None, c(2), None, c(1), c(1)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..50 {
            let p = grid.random_empty(&mut rng).unwrap();
            assert!(grid.is_empty(p));
        }

        let full = OccupancyGrid::from_cells(1, 1, vec![c(1)]).unwrap();
        assert_eq!(full.random_empty(&mut rng), None);
    }

    #[test]
    fn test_snapshot_is_row_major_and_restorable() {
        let grid = OccupancyGrid::from_cells(2, 2, vec![c(1), None, None, c(2)]).unwrap();
        let snapshot = grid.snapshot();
        let positions: Vec<_> = snapshot.cells.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            positions,
            vec![
                Position::new(0, 0),
                Position::new(1, 0),
                Position::new(0, 1),
                Position::new(1, 1)
            ]
        );
        assert_eq!(snapshot.to_ascii(), "1.\n.2\n");

        let restored = OccupancyGrid::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert!(restored.check_invariants().is_ok());
    }
}
