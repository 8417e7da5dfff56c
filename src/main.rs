//! Schelling - Entry Point
//!
//! Runs a scenario (from a TOML file, flags, or both) and prints a summary or
//! the full JSON report. `sweep` repeats a scenario across thresholds.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use schelling::core::config::{SimulationConfig, ThresholdSpec};
use schelling::core::error::Result;
use schelling::simulation::sweep::{default_thresholds, threshold_sweep};
use schelling::simulation::Simulation;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "schelling")]
#[command(about = "Schelling segregation model on a discrete grid")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one scenario through both phases
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Print the initial and final grid as text
        #[arg(long)]
        show_grid: bool,

        /// Write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Final mean similarity for a range of uniform thresholds
    Sweep {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Comma-separated thresholds (default 0.0,0.1,...,0.7)
        #[arg(long, value_delimiter = ',')]
        thresholds: Vec<f64>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Scenario file plus per-field overrides
#[derive(clap::Args, Debug)]
struct ScenarioArgs {
    /// Scenario TOML file (e.g. data/scenarios/strict_80.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid width in cells
    #[arg(long)]
    width: Option<usize>,

    /// Grid height in cells
    #[arg(long)]
    height: Option<usize>,

    /// Fraction of cells left empty
    #[arg(long)]
    empty_ratio: Option<f64>,

    /// Number of agent colors
    #[arg(long)]
    colors: Option<u16>,

    /// Similarity threshold applied to every color
    #[arg(long)]
    threshold: Option<f64>,

    /// Round budget for both phases
    #[arg(long)]
    iterations: Option<usize>,

    /// Search radius for phase-1 relocation
    #[arg(long)]
    radius: Option<usize>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,
}

impl ScenarioArgs {
    fn resolve(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(ratio) = self.empty_ratio {
            config.empty_ratio = ratio;
        }
        if let Some(colors) = self.colors {
            config.color_count = colors;
        }
        if let Some(threshold) = self.threshold {
            config.thresholds = ThresholdSpec::Uniform(threshold);
        }
        if let Some(iterations) = self.iterations {
            config.max_iterations_phase1 = iterations;
            config.max_iterations_phase2 = iterations;
        }
        if let Some(radius) = self.radius {
            config.neighborhood_radius = radius;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schelling=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            scenario,
            format,
            show_grid,
            output,
        } => {
            let config = scenario.resolve()?;
            let sim = Simulation::new(config)?;
            let initial_grid = sim.grid().snapshot();
            let report = sim.run()?;

            if let Some(path) = &output {
                fs::write(path, report.to_json())?;
                tracing::info!("Full report written to {}", path.display());
            }

            match format {
                OutputFormat::Json => println!("{}", report.to_json()),
                OutputFormat::Text => {
                    if show_grid {
                        println!("Initial state:\n{}", initial_grid.to_ascii());
                    }
                    println!("{}", report.summary());
                    if show_grid {
                        println!("\nFinal state:\n{}", report.final_grid.to_ascii());
                    }
                }
            }
        }
        Commands::Sweep {
            scenario,
            thresholds,
            format,
        } => {
            let config = scenario.resolve()?;
            let thresholds = if thresholds.is_empty() {
                default_thresholds()
            } else {
                thresholds
            };
            let points = threshold_sweep(&config, &thresholds)?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&points)?),
                OutputFormat::Text => {
                    println!("threshold  initial  final  unsatisfied");
                    for point in &points {
                        println!(
                            "{:>9.2}  {:>7.3}  {:>5.3}  {:>11}",
                            point.threshold,
                            point.initial_mean_similarity,
                            point.final_mean_similarity,
                            point.final_unsatisfied
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
