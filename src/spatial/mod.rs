//! Grid storage and neighborhood geometry

pub mod grid;

pub use grid::{GridSnapshot, OccupancyGrid};
