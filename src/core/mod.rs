pub mod config;
pub mod error;
pub mod types;

pub use config::{SimulationConfig, ThresholdSpec, ThresholdTable};
pub use error::{Result, SchellingError};
pub use types::{Color, Position};
