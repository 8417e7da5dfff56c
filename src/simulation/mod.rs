//! Schelling segregation simulation
//!
//! [`Simulation`] owns the grid, the validated thresholds and the single
//! seeded generator for a run, and hands the generator to each phase
//! explicitly. [`simulate`] is the one-call entry point.

pub mod metrics;
pub mod movement;
pub mod output;
pub mod phases;
pub mod population;
pub mod satisfaction;
pub mod sweep;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::{SimulationConfig, ThresholdTable};
use crate::core::error::{Result, SchellingError};
use crate::spatial::grid::OccupancyGrid;

pub use metrics::MetricsSummary;
pub use output::{SimulationOutput, SimulationStats};
pub use phases::PhaseReport;
pub use sweep::{threshold_sweep, SweepPoint};

/// A configured run in progress
pub struct Simulation {
    config: SimulationConfig,
    thresholds: ThresholdTable,
    grid: OccupancyGrid,
    /// Random number generator (deterministic)
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Validate the config and populate a fresh grid from its seed
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let thresholds = config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let grid = population::populate(&config, &mut rng)?;
        Ok(Self {
            config,
            thresholds,
            grid,
            rng,
        })
    }

    /// Start from a known layout instead of `populate`
    ///
    /// The grid must match the configured dimensions and only hold colors
    /// `1..=color_count`. `empty_ratio` is not applied to a supplied grid.
    pub fn with_grid(config: SimulationConfig, grid: OccupancyGrid) -> Result<Self> {
        let thresholds = config.validate()?;
        if grid.width() != config.width || grid.height() != config.height {
            return Err(SchellingError::ConfigError(format!(
                "grid is {}x{} but config expects {}x{}",
                grid.width(),
                grid.height(),
                config.width,
                config.height
            )));
        }
        if let Some((position, color)) = grid
            .occupants()
            .find(|&(_, color)| thresholds.get(color).is_none())
        {
            return Err(SchellingError::ConfigError(format!(
                "agent at {} has color {} outside 1..={}",
                position, color, config.color_count
            )));
        }

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            thresholds,
            grid,
            rng,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Statistics for the current grid state
    pub fn metrics(&self) -> MetricsSummary {
        MetricsSummary::collect(&self.grid, &self.thresholds, self.config.parallel_threshold)
    }

    pub fn run_relocation_phase(&mut self) -> Result<PhaseReport> {
        phases::run_relocation_phase(
            &mut self.grid,
            &self.thresholds,
            self.config.neighborhood_radius,
            self.config.max_iterations_phase1,
            &mut self.rng,
        )
    }

    pub fn run_swap_phase(&mut self) -> Result<PhaseReport> {
        phases::run_swap_phase(
            &mut self.grid,
            &self.thresholds,
            self.config.max_iterations_phase2,
            self.config.parallel_threshold,
            &mut self.rng,
        )
    }

    /// Run phase 1 then phase 2 and report before/after statistics
    pub fn run(mut self) -> Result<SimulationOutput> {
        let start = std::time::Instant::now();

        let initial = self.metrics();
        tracing::info!(
            "Starting {}x{} run: {} agents, {} unsatisfied",
            self.config.width,
            self.config.height,
            initial.agents,
            initial.unsatisfied
        );

        let relocation_phase = self.run_relocation_phase()?;
        let swap_phase = self.run_swap_phase()?;
        let final_metrics = self.metrics();

        Ok(SimulationOutput::new(
            self.config,
            initial,
            final_metrics,
            relocation_phase,
            swap_phase,
            self.grid.snapshot(),
            start.elapsed(),
        ))
    }
}

/// Run the full two-phase simulation for a config
pub fn simulate(config: SimulationConfig) -> Result<SimulationOutput> {
    Simulation::new(config)?.run()
}
