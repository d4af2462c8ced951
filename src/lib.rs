//! # EnvSynth - Environmental value synthesis
//!
//! Produces plausible environmental sensor readings for any coordinate and
//! time without a physical sensor.
//!
//! ## Pipeline
//!
//! 1. **Region**: classify the coordinate into one of ten land-cover classes
//! 2. **Temporal features**: cyclic day-of-year / time-of-day encodings
//! 3. **Tensor**: synthesize a `[3, 128, 128, 1]` spatio-temporal patch
//! 4. **Model**: reduce the model output to an activity scalar and an uncertainty
//! 5. **Adjust**: shift the regional baseline for season and time of day
//! 6. **Synthesize**: scale values by activity and add measurement noise
//! 7. **Constrain**: elevation correction and urban/rural calibration
//! 8. **Assemble**: package readings and metadata
//!
//! ## Quick Start
//!
//! ```rust
//! use envsynth::{NoNoise, Predictor, RegionType};
//!
//! let predictor = Predictor::builder()
//!     .noise(NoNoise)
//!     .build()
//!     .unwrap();
//!
//! let result = predictor.predict("20250615", 40.7, -74.0, Some("14:00")).unwrap();
//! assert_eq!(result.metadata.season.to_string(), "summer");
//! assert!((10.0..=100.0).contains(&result.bme688.humidity));
//!
//! assert_eq!(predictor.region_for(40.7, -74.0).unwrap(), RegionType::Urban);
//! ```
//!
//! ## Modules
//!
//! - [`region`]: Rule-cascade region classifier
//! - [`temporal`]: Season, time of day and cyclic encodings
//! - [`tensor`]: Synthetic model input
//! - [`model`]: Model trait, adapter and surrogate model
//! - [`tables`]: Baseline, adjustment and calibration tables
//! - [`adjust`]: Seasonal and diurnal adjustment
//! - [`noise`]: Pluggable measurement noise
//! - [`synthesis`]: Activity scaling laws
//! - [`constraints`]: Physical constraints
//! - [`result`]: Result types
//! - [`predictor`]: The `predict` entry point
//! - [`sampling`]: Heatmap sampling and AQI bands

// Modules
pub mod adjust;
pub mod config;
pub mod constraints;
pub mod error;
pub mod model;
pub mod noise;
pub mod predictor;
pub mod region;
pub mod result;
pub mod sampling;
pub mod synthesis;
pub mod tables;
pub mod temporal;
pub mod tensor;

// Re-exports for convenient access
pub use config::{EngineConfig, NoiseConfig, SamplingConfig};
pub use error::{
    ConstructionError, EnvSynthError, InferenceError, InputError, PredictionError, Result,
    SamplingError,
};
pub use model::{Inference, ModelAdapter, PredictiveModel, SurrogateModel};
pub use noise::{HashNoise, NoNoise, NoiseContext, NoiseStrategy, SensorField, UniformNoise};
pub use predictor::{Predictor, PredictorBuilder};
pub use region::{classify, RegionType};
pub use result::{PredictionMetadata, PredictionResult, PredictionSummary};
pub use sampling::{sample, AqiCategory, HeatmapSamples, SamplePoint};
pub use tables::{EnvValues, RegionalTables};
pub use temporal::{Season, TemporalFeatures, TimeOfDay};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
