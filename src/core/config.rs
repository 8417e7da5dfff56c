//! Simulation configuration
//!
//! Scenarios are plain TOML files (see `data/scenarios/`) or are built in code.
//! Every field is checked by [`SimulationConfig::validate`] before a grid is
//! populated; the validated thresholds come back as a dense [`ThresholdTable`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SchellingError};
use crate::core::types::Color;

/// Seed used when a scenario does not name one, so runs reproduce by default
pub const DEFAULT_SEED: u64 = 12345;

/// Similarity thresholds as written in a scenario
///
/// Either a single value broadcast to every color:
///
/// ```toml
/// thresholds = 0.3
/// ```
///
/// or one entry per color number:
///
/// ```toml
/// [thresholds]
/// 1 = 0.6
/// 2 = 0.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdSpec {
    Uniform(f64),
    /// Keys are color numbers; TOML table keys are always strings
    PerColor(BTreeMap<String, f64>),
}

impl ThresholdSpec {
    /// Build a per-color spec from `(color number, threshold)` pairs
    pub fn per_color(entries: impl IntoIterator<Item = (u16, f64)>) -> Self {
        Self::PerColor(
            entries
                .into_iter()
                .map(|(color, threshold)| (color.to_string(), threshold))
                .collect(),
        )
    }
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        Self::Uniform(0.3)
    }
}

/// Validated minimum similarity ratio for each color `1..=color_count`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTable {
    thresholds: Vec<f64>,
}

impl ThresholdTable {
    /// Same threshold for every color
    pub fn uniform(color_count: u16, threshold: f64) -> Result<Self> {
        if color_count < 1 {
            return Err(SchellingError::ConfigError(
                "color_count must be at least 1".into(),
            ));
        }
        let threshold = check_threshold(Color(1), threshold)?;
        Ok(Self {
            thresholds: vec![threshold; usize::from(color_count)],
        })
    }

    /// Resolve a scenario spec against the configured color count
    ///
    /// A per-color table must name every color exactly once and nothing else.
    pub fn from_spec(spec: &ThresholdSpec, color_count: u16) -> Result<Self> {
        let entries = match spec {
            ThresholdSpec::Uniform(value) => return Self::uniform(color_count, *value),
            ThresholdSpec::PerColor(entries) => entries,
        };

        let mut thresholds: Vec<Option<f64>> = vec![None; usize::from(color_count)];
        for (key, &value) in entries {
            let color = key
                .trim()
                .parse::<u16>()
                .map(Color)
                .map_err(|_| {
                    SchellingError::ConfigError(format!(
                        "threshold key '{}' is not a color number",
                        key
                    ))
                })?;
            if color.0 < 1 || color.0 > color_count {
                return Err(SchellingError::ConfigError(format!(
                    "threshold given for color {} but color_count is {}",
                    color, color_count
                )));
            }
            thresholds[color.index()] = Some(check_threshold(color, value)?);
        }

        let thresholds = thresholds
            .into_iter()
            .zip(Color::all(color_count))
            .map(|(value, color)| {
                value.ok_or_else(|| {
                    SchellingError::ConfigError(format!("no threshold given for color {}", color))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if thresholds.is_empty() {
            return Err(SchellingError::ConfigError(
                "color_count must be at least 1".into(),
            ));
        }

        Ok(Self { thresholds })
    }

    #[inline]
    pub fn get(&self, color: Color) -> Option<f64> {
        if color.0 == 0 {
            return None;
        }
        self.thresholds.get(color.index()).copied()
    }

    pub fn color_count(&self) -> u16 {
        self.thresholds.len() as u16
    }

    pub fn colors(&self) -> impl Iterator<Item = Color> {
        Color::all(self.color_count())
    }
}

fn check_threshold(color: Color, value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(SchellingError::ConfigError(format!(
            "threshold for color {} must lie in [0, 1], got {}",
            color, value
        )));
    }
    Ok(value)
}

/// Configuration for one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid width in cells
    pub width: usize,
    /// Grid height in cells
    pub height: usize,
    /// Fraction of cells left empty by `populate`, in `[0, 1)`
    pub empty_ratio: f64,
    /// Number of agent types
    pub color_count: u16,
    /// Minimum acceptable share of like-colored neighbors
    pub thresholds: ThresholdSpec,
    /// Chebyshev radius searched for an empty cell during phase 1
    ///
    /// Satisfaction itself always looks at the 8-cell Moore neighborhood.
    pub neighborhood_radius: usize,
    /// Round budget of the relocation phase
    pub max_iterations_phase1: usize,
    /// Round budget of the swap phase
    pub max_iterations_phase2: usize,
    /// Seed for the single generator threaded through the run
    pub seed: u64,
    /// Agent count from which read-only scans run on the rayon pool
    pub parallel_threshold: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            empty_ratio: 0.3,
            color_count: 2,
            thresholds: ThresholdSpec::default(),
            neighborhood_radius: 1,
            max_iterations_phase1: 200,
            max_iterations_phase2: 200,
            seed: DEFAULT_SEED,
            parallel_threshold: 1000,
        }
    }
}

impl SimulationConfig {
    /// Config with the given shape and defaults for everything else
    pub fn new(
        width: usize,
        height: usize,
        empty_ratio: f64,
        color_count: u16,
        thresholds: ThresholdSpec,
    ) -> Self {
        Self {
            width,
            height,
            empty_ratio,
            color_count,
            thresholds,
            ..Self::default()
        }
    }

    /// Parse a scenario from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a scenario file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Check every field and resolve the threshold table
    pub fn validate(&self) -> Result<ThresholdTable> {
        if self.width == 0 || self.height == 0 {
            return Err(SchellingError::ConfigError(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(SchellingError::ConfigError(format!(
                "grid {}x{} has too many cells",
                self.width, self.height
            )));
        }
        if !self.empty_ratio.is_finite() || !(0.0..1.0).contains(&self.empty_ratio) {
            return Err(SchellingError::ConfigError(format!(
                "empty_ratio must lie in [0, 1), got {}",
                self.empty_ratio
            )));
        }
        if self.color_count < 1 {
            return Err(SchellingError::ConfigError(
                "color_count must be at least 1".into(),
            ));
        }
        if self.neighborhood_radius < 1 {
            return Err(SchellingError::ConfigError(
                "neighborhood_radius must be at least 1".into(),
            ));
        }

        ThresholdTable::from_spec(&self.thresholds, self.color_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_config_error(result: Result<ThresholdTable>) {
        assert!(
            matches!(result, Err(SchellingError::ConfigError(_))),
            "expected ConfigError, got {:?}",
            result
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        let table = config.validate().expect("default config should validate");
        assert_eq!(table.color_count(), 2);
        assert_eq!(table.get(Color(1)), Some(0.3));
        assert_eq!(table.get(Color(2)), Some(0.3));
        assert_eq!(config.seed, DEFAULT_SEED);
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        let mut config = SimulationConfig::default();
        config.width = 0;
        assert_config_error(config.validate());

        let mut config = SimulationConfig::default();
        config.height = 0;
        assert_config_error(config.validate());
    }

    #[test]
    fn test_rejects_empty_ratio_out_of_range() {
        for ratio in [-0.1, 1.0, 1.5, f64::NAN] {
            let mut config = SimulationConfig::default();
            config.empty_ratio = ratio;
            assert_config_error(config.validate());
        }
    }

    #[test]
    fn test_rejects_zero_colors_and_radius() {
        let mut config = SimulationConfig::default();
        config.color_count = 0;
        assert_config_error(config.validate());

        let mut config = SimulationConfig::default();
        config.neighborhood_radius = 0;
        assert_config_error(config.validate());
    }

    #[test]
    fn test_threshold_bounds() {
        assert_config_error(ThresholdTable::from_spec(&ThresholdSpec::Uniform(1.2), 2));
        assert_config_error(ThresholdTable::from_spec(&ThresholdSpec::Uniform(-0.01), 2));
        assert!(ThresholdTable::from_spec(&ThresholdSpec::Uniform(0.0), 2).is_ok());
        assert!(ThresholdTable::from_spec(&ThresholdSpec::Uniform(1.0), 2).is_ok());
    }

    #[test]
    fn test_per_color_table_must_cover_every_color() {
        let spec = ThresholdSpec::per_color([(1, 0.6)]);
        assert_config_error(ThresholdTable::from_spec(&spec, 2));

        let spec = ThresholdSpec::per_color([(1, 0.6), (2, 0.5), (3, 0.4)]);
        assert_config_error(ThresholdTable::from_spec(&spec, 2));

        let spec = ThresholdSpec::per_color([(1, 0.6), (2, 0.5)]);
        let table = ThresholdTable::from_spec(&spec, 2).unwrap();
        assert_eq!(table.get(Color(1)), Some(0.6));
        assert_eq!(table.get(Color(2)), Some(0.5));
        assert_eq!(table.get(Color(3)), None);
        assert_eq!(table.get(Color(0)), None);
    }

    #[test]
    fn test_per_color_rejects_non_numeric_key() {
        let mut entries = BTreeMap::new();
        entries.insert("blue".to_string(), 0.5);
        assert_config_error(ThresholdTable::from_spec(&ThresholdSpec::PerColor(entries), 1));
    }

    #[test]
    fn test_parse_uniform_toml() {
        let config = SimulationConfig::from_toml_str(
            r#"
            width = 5
            height = 5
            empty_ratio = 0.3
            color_count = 2
            thresholds = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(config.width, 5);
        assert_eq!(config.thresholds, ThresholdSpec::Uniform(0.3));
        assert_eq!(config.neighborhood_radius, 1);
        assert_eq!(config.max_iterations_phase1, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_per_color_toml() {
        let config = SimulationConfig::from_toml_str(
            r#"
            width = 50
            height = 50
            color_count = 2
            seed = 7

            [thresholds]
            1 = 0.6
            2 = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        let table = config.validate().unwrap();
        assert_eq!(table.get(Color(1)), Some(0.6));
        assert_eq!(table.get(Color(2)), Some(0.4));
    }

    #[test]
    fn test_parse_rejects_negative_width() {
        let result = SimulationConfig::from_toml_str("width = -3");
        assert!(matches!(result, Err(SchellingError::TomlError(_))));
    }
}
