//! Schelling - residential segregation on a discrete grid
//!
//! Agents of several colors occupy grid cells. An agent is unsatisfied when too
//! few of its occupied neighbors share its color; unsatisfied agents move to
//! empty cells (phase 1) and then trade places with each other (phase 2).

pub mod core;
pub mod simulation;
pub mod spatial;
