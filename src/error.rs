//! Error types for envsynth
//!
//! Construction failures are fatal and surface before any request is served.
//! Per-request failures are returned as [`PredictionError`] values so batch
//! callers can skip a failed point and keep going.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for envsynth operations
pub type Result<T> = std::result::Result<T, EnvSynthError>;

/// Main error type for envsynth operations
#[derive(Error, Debug)]
pub enum EnvSynthError {
    /// Predictor could not be built
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// A single prediction failed
    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    /// Heatmap sampling failed
    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    /// Configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tables or results could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while building a predictor
#[derive(Error, Debug)]
pub enum ConstructionError {
    /// Model file does not exist
    #[error("Model file not found at {}", path.display())]
    ModelNotFound { path: PathBuf },

    /// Model file exists but could not be read or parsed
    #[error("Model file {} is unreadable: {reason}", path.display())]
    ModelUnreadable { path: PathBuf, reason: String },

    /// Model self-test produced the wrong output shape
    #[error("Model output shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Model self-test raised
    #[error("Model validation failed: {0}")]
    SelfTest(String),

    /// Table file could not be read or parsed
    #[error("Table file {} is unreadable: {reason}", path.display())]
    TablesUnreadable { path: PathBuf, reason: String },

    /// A region is missing from a lookup table
    #[error("Table {table} has no entry for region {region}")]
    IncompleteTable { table: String, region: String },
}

/// Per-request input errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// Date is not `YYYYMMDD` or time is not `HH:MM`
    #[error("time data '{input}' does not match format '%Y%m%d %H:%M'")]
    InvalidTimestamp { input: String },

    /// Latitude or longitude is NaN or infinite
    #[error("Non-finite coordinate: {name}={value}")]
    NonFiniteCoordinate { name: &'static str, value: f64 },
}

/// Per-request model errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// The model call raised
    #[error("Model call failed: {0}")]
    ModelFailed(String),

    /// The model returned a tensor of the wrong shape
    #[error("Model output shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The mean or uncertainty field contains NaN or infinity
    #[error("Model output contains non-finite values")]
    NonFinite,
}

/// Tagged per-request error returned by `predict`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// Malformed date/time or coordinates
    #[error(transparent)]
    Input(#[from] InputError),

    /// Inference failed
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictionError {
    /// Category message exposed to callers alongside the detail.
    pub fn message(&self) -> &'static str {
        match self {
            PredictionError::Input(_) => "Invalid date/time format or input values",
            PredictionError::Inference(_) => "Prediction failed",
        }
    }
}

impl Serialize for PredictionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PredictionError", 2)?;
        state.serialize_field("error", &self.to_string())?;
        state.serialize_field("message", self.message())?;
        state.end()
    }
}

/// Errors from heatmap sampling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    /// Every sample point failed
    #[error("No valid predictions obtained for the heatmap ({skipped} points skipped)")]
    NoValidSamples { skipped: usize },

    /// Radius is negative or not finite
    #[error("Invalid sampling radius: {0}")]
    InvalidRadius(f64),

    /// Zero points requested
    #[error("At least one sample point is required")]
    NoPoints,
}
