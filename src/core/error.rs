use thiserror::Error;

use crate::core::types::{Color, Position};

#[derive(Error, Debug)]
pub enum SchellingError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invariant violation at {position}: {reason}")]
    InvariantViolation { position: Position, reason: String },

    #[error("No vacant cell to relocate agent at {position} (color {color})")]
    NoVacancy { position: Position, color: Color },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl SchellingError {
    pub(crate) fn invariant(position: Position, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            position,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchellingError>;
