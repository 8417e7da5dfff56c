//! Initial placement of agents

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SchellingError};
use crate::core::types::{Color, Position};
use crate::spatial::grid::OccupancyGrid;

/// Number of cells `populate` leaves empty
pub fn empty_cell_target(config: &SimulationConfig) -> usize {
    (config.empty_ratio * config.cell_count() as f64).floor() as usize
}

/// Partition a fresh grid into empty cells and colored agents
///
/// Positions are shuffled; the first `floor(empty_ratio * cells)` stay empty
/// and the rest are dealt colors round-robin, so color sizes differ by at
/// most one.
pub fn populate<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Result<OccupancyGrid> {
    if config.width == 0 || config.height == 0 || config.color_count < 1 {
        return Err(SchellingError::ConfigError(format!(
            "cannot populate a {}x{} grid with {} colors",
            config.width, config.height, config.color_count
        )));
    }

    let mut positions: Vec<Position> = (0..config.width)
        .flat_map(|x| (0..config.height).map(move |y| Position::new(x, y)))
        .collect();
    positions.shuffle(rng);

    let n_empty = empty_cell_target(config).min(positions.len());
    let mut grid = OccupancyGrid::new(config.width, config.height);
    let colors = usize::from(config.color_count);

    for (i, &position) in positions[n_empty..].iter().enumerate() {
        let color = Color((i % colors) as u16 + 1);
        grid.place(position, color)?;
    }

    tracing::debug!(
        "Populated {}x{} grid: {} agents, {} empty",
        config.width,
        config.height,
        grid.occupied_count(),
        grid.empty_count()
    );

    Ok(grid)
}
