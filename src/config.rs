// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Engine configuration.

use crate::error::{EnvSynthError, Result};
use crate::noise::{HashNoise, NoNoise, NoiseStrategy, UniformNoise};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration for building a [`Predictor`](crate::Predictor).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Measurement noise strategy.
    pub noise: NoiseConfig,

    /// JSON table file; built-in tables when absent.
    pub tables_path: Option<PathBuf>,

    /// JSON surrogate model weights; built-in weights when absent.
    pub model_path: Option<PathBuf>,

    /// Seed for the model self-test input (entropy when absent).
    pub self_test_seed: Option<u64>,
}

impl EngineConfig {
    /// Set the noise strategy.
    pub fn with_noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    /// Load tables from a file.
    pub fn with_tables_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tables_path = Some(path.into());
        self
    }

    /// Load the model from a file.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Seed the model self-test.
    pub fn with_self_test_seed(mut self, seed: u64) -> Self {
        self.self_test_seed = Some(seed);
        self
    }

    /// Parse configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EnvSynthError::Config(e.to_string()))
    }

    /// Read configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EnvSynthError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}

/// Noise strategy selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum NoiseConfig {
    /// Bounded uniform noise, entropy-seeded unless `seed` is given.
    Uniform {
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Deterministic SHA-256 keyed noise.
    Hash,
    /// No noise.
    Disabled,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig::Uniform { seed: None }
    }
}

impl NoiseConfig {
    /// Instantiate the configured strategy.
    pub fn build(&self) -> Box<dyn NoiseStrategy> {
        match self {
            NoiseConfig::Uniform { seed: Some(seed) } => Box::new(UniformNoise::seeded(*seed)),
            NoiseConfig::Uniform { seed: None } => Box::new(UniformNoise::new()),
            NoiseConfig::Hash => Box::new(HashNoise),
            NoiseConfig::Disabled => Box::new(NoNoise),
        }
    }
}

/// Heatmap sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Half-width of the sampling square, in degrees.
    pub radius_deg: f64,
    /// Number of points to draw.
    pub points: usize,
    /// Seed for the jitter RNG.
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            radius_deg: 0.1,
            points: 50,
            seed: 42,
        }
    }
}

impl SamplingConfig {
    pub fn with_radius(mut self, radius_deg: f64) -> Self {
        self.radius_deg = radius_deg;
        self
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.noise, NoiseConfig::Uniform { seed: None });
        assert!(config.tables_path.is_none());
        assert!(config.model_path.is_none());

        let sampling = SamplingConfig::default();
        assert_eq!(sampling.radius_deg, 0.1);
        assert_eq!(sampling.points, 50);
        assert_eq!(sampling.seed, 42);
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_noise(NoiseConfig::Hash)
            .with_model_path("/opt/model.json")
            .with_self_test_seed(5);
        assert_eq!(config.noise, NoiseConfig::Hash);
        assert_eq!(config.model_path, Some(PathBuf::from("/opt/model.json")));
        assert_eq!(config.self_test_seed, Some(5));
    }

    #[test]
    fn test_parse_partial_json() {
        let config =
            EngineConfig::from_json_str(r#"{"noise": {"strategy": "uniform", "seed": 7}}"#).unwrap();
        assert_eq!(config.noise, NoiseConfig::Uniform { seed: Some(7) });
        assert!(config.tables_path.is_none());

        let config = EngineConfig::from_json_str(r#"{"noise": {"strategy": "disabled"}}"#).unwrap();
        assert_eq!(config.noise, NoiseConfig::Disabled);

        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_parse_rejects_unknown_strategy() {
        let err = EngineConfig::from_json_str(r#"{"noise": {"strategy": "gaussian"}}"#).unwrap_err();
        assert!(matches!(err, EnvSynthError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"noise": {{"strategy": "hash"}}, "tables_path": "/etc/envsynth/tables.json"}}"#
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.noise, NoiseConfig::Hash);
        assert_eq!(
            config.tables_path,
            Some(PathBuf::from("/etc/envsynth/tables.json"))
        );

        assert!(EngineConfig::from_json_file("/no/such/config.json").is_err());
    }

    #[test]
    fn test_build_strategy_names() {
        assert_eq!(NoiseConfig::default().build().name(), "uniform");
        assert_eq!(NoiseConfig::Hash.build().name(), "hash");
        assert_eq!(NoiseConfig::Disabled.build().name(), "disabled");
    }

    #[test]
    fn test_sampling_builders() {
        let sampling = SamplingConfig::default()
            .with_radius(0.25)
            .with_points(10)
            .with_seed(1);
        assert_eq!(sampling.radius_deg, 0.25);
        assert_eq!(sampling.points, 10);
        assert_eq!(sampling.seed, 1);
    }
}
