//! Pipeline tuning, loadable from TOML.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```toml
//! [preprocess]
//! block_size = 15
//!
//! [lines]
//! tolerance = 14
//! strategy = "sorted"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub lines: LineConfig,
}

impl PipelineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.preprocess;
        if p.block_size < 3 || p.block_size % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "preprocess.block_size must be odd and >= 3, got {}",
                p.block_size
            )));
        }
        if !(p.epsilon_ratio > 0.0 && p.epsilon_ratio < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "preprocess.epsilon_ratio must be in (0, 1), got {}",
                p.epsilon_ratio
            )));
        }
        if self.lines.tolerance <= 0 {
            return Err(ConfigError::Invalid(format!(
                "lines.tolerance must be positive, got {}",
                self.lines.tolerance
            )));
        }
        Ok(())
    }
}

/// Binarization and contour approximation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side of the Gaussian-weighted neighbourhood used for the local threshold (odd).
    pub block_size: u32,
    /// Subtracted from the local weighted mean to form the threshold.
    pub offset: f32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub epsilon_ratio: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { block_size: 11, offset: 2.0, epsilon_ratio: 0.02 }
    }
}

impl PreprocessConfig {
    /// Gaussian sigma for `block_size`, using the usual
    /// `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule.
    pub fn sigma(&self) -> f32 {
        0.3 * ((self.block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStrategy {
    /// Input-order scan, first group within tolerance wins.
    #[default]
    Greedy,
    /// Sort by y first, then split into bands; independent of input order.
    Sorted,
}

impl std::str::FromStr for LineStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "greedy" => Ok(LineStrategy::Greedy),
            "sorted" => Ok(LineStrategy::Sorted),
            other => Err(format!("Unknown line strategy: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Maximum vertical distance (exclusive) between a word and a group anchor.
    pub tolerance: i32,
    pub strategy: LineStrategy,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self { tolerance: 10, strategy: LineStrategy::Greedy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_receipt_tuning() {
        let c = PipelineConfig::default();
        assert_eq!(c.preprocess.block_size, 11);
        assert_eq!(c.preprocess.offset, 2.0);
        assert_eq!(c.lines.tolerance, 10);
        assert_eq!(c.lines.strategy, LineStrategy::Greedy);
        assert!((c.preprocess.sigma() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let c = PipelineConfig::from_toml("[lines]\ntolerance = 14\nstrategy = \"sorted\"\n").unwrap();
        assert_eq!(c.lines.tolerance, 14);
        assert_eq!(c.lines.strategy, LineStrategy::Sorted);
        assert_eq!(c.preprocess, PreprocessConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(PipelineConfig::from_toml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn even_block_size_rejected() {
        let err = PipelineConfig::from_toml("[preprocess]\nblock_size = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_tolerance_rejected() {
        let err = PipelineConfig::from_toml("[lines]\ntolerance = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_strategy_is_parse_error() {
        let err = PipelineConfig::from_toml("[lines]\nstrategy = \"fuzzy\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[preprocess]\nepsilon_ratio = 0.03").unwrap();
        let c = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(c.preprocess.epsilon_ratio, 0.03);
    }

    #[test]
    fn strategy_from_str() {
        use std::str::FromStr;
        assert_eq!(LineStrategy::from_str("Sorted").unwrap(), LineStrategy::Sorted);
        assert!(LineStrategy::from_str("other").is_err());
    }
}
