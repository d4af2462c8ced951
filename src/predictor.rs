// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prediction entry point.
//!
//! A [`Predictor`] owns a validated model, the regional tables and a noise
//! strategy. Everything it holds is read-only after construction, so one
//! instance can be shared across threads behind an `Arc`.

use crate::adjust::adjust;
use crate::config::EngineConfig;
use crate::constraints;
use crate::error::{ConstructionError, InputError, PredictionError};
use crate::model::{ModelAdapter, PredictiveModel, SurrogateModel};
use crate::noise::{NoiseContext, NoiseStrategy, UniformNoise};
use crate::region::{classify, RegionType};
use crate::result::{assemble, PredictionResult, RequestInfo};
use crate::synthesis::synthesize;
use crate::tables::RegionalTables;
use crate::temporal::{effective_time, parse_timestamp, TemporalFeatures};
use crate::tensor;
use log::{debug, info};
use std::fmt;

/// Valid latitude range, degrees
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

/// Valid longitude range, degrees
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// Environmental value predictor.
pub struct Predictor {
    adapter: ModelAdapter,
    tables: RegionalTables,
    noise: Box<dyn NoiseStrategy>,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("model", &self.adapter.model_name())
            .field("noise", &self.noise.name())
            .finish_non_exhaustive()
    }
}

impl Predictor {
    /// Start building a predictor.
    pub fn builder() -> PredictorBuilder {
        PredictorBuilder::default()
    }

    /// Build from configuration, loading model and tables from disk if named.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConstructionError> {
        let mut builder = Self::builder().boxed_noise(config.noise.build());

        if let Some(path) = &config.model_path {
            builder = builder.model(SurrogateModel::load(path)?);
        }
        if let Some(path) = &config.tables_path {
            builder = builder.tables(RegionalTables::from_json_file(path)?);
            info!("loaded regional tables from {}", path.display());
        }
        if let Some(seed) = config.self_test_seed {
            builder = builder.self_test_seed(seed);
        }
        builder.build()
    }

    /// Predict sensor values for a date (`YYYYMMDD`), coordinate and optional
    /// time (`HH:MM`, midnight when absent).
    ///
    /// Finite out-of-range coordinates are clamped; NaN or infinite ones are
    /// rejected. Malformed date/time strings and model failures come back as
    /// [`PredictionError`] values, never panics.
    pub fn predict(
        &self,
        date: &str,
        latitude: f64,
        longitude: f64,
        time: Option<&str>,
    ) -> Result<PredictionResult, PredictionError> {
        let (latitude, longitude) = clamp_coordinates(latitude, longitude)?;
        let time = effective_time(time);
        let timestamp = parse_timestamp(date, Some(time))?;

        let region = classify(latitude, longitude);
        let features = TemporalFeatures::extract(&timestamp);
        debug!(
            "predict {latitude:.4},{longitude:.4} at {timestamp}: region={region} season={} time_of_day={}",
            features.season, features.time_of_day
        );

        let sequence = tensor::generate_for(region, &features);
        let inference = self.adapter.infer(&sequence)?;

        let adjusted = adjust(&self.tables, region, &features);
        let ctx = NoiseContext {
            latitude,
            longitude,
            timestamp,
        };
        let raw = synthesize(
            &adjusted,
            inference.normalized_activity,
            self.noise.as_ref(),
            &ctx,
        );
        let values = constraints::apply(raw, region, &self.tables.calibration);

        Ok(assemble(
            &values,
            RequestInfo {
                latitude,
                longitude,
                date: date.to_string(),
                time: time.to_string(),
                region,
                features,
                inference,
            },
        ))
    }

    /// Region a coordinate resolves to, after clamping.
    pub fn region_for(&self, latitude: f64, longitude: f64) -> Result<RegionType, InputError> {
        let (latitude, longitude) = clamp_coordinates(latitude, longitude)?;
        Ok(classify(latitude, longitude))
    }

    pub fn tables(&self) -> &RegionalTables {
        &self.tables
    }

    pub fn model_name(&self) -> &str {
        self.adapter.model_name()
    }

    pub fn noise_name(&self) -> &'static str {
        self.noise.name()
    }
}

/// Reject non-finite coordinates and clamp the rest into range.
pub fn clamp_coordinates(latitude: f64, longitude: f64) -> Result<(f64, f64), InputError> {
    if !latitude.is_finite() {
        return Err(InputError::NonFiniteCoordinate {
            name: "latitude",
            value: latitude,
        });
    }
    if !longitude.is_finite() {
        return Err(InputError::NonFiniteCoordinate {
            name: "longitude",
            value: longitude,
        });
    }
    Ok((
        latitude.clamp(LATITUDE_RANGE.0, LATITUDE_RANGE.1),
        longitude.clamp(LONGITUDE_RANGE.0, LONGITUDE_RANGE.1),
    ))
}

/// Builder for [`Predictor`].
///
/// Unset parts default to the built-in surrogate model, the built-in tables
/// and entropy-seeded uniform noise.
#[derive(Default)]
pub struct PredictorBuilder {
    model: Option<Box<dyn PredictiveModel>>,
    tables: Option<RegionalTables>,
    noise: Option<Box<dyn NoiseStrategy>>,
    self_test_seed: Option<u64>,
}

impl PredictorBuilder {
    pub fn model(self, model: impl PredictiveModel + 'static) -> Self {
        self.boxed_model(Box::new(model))
    }

    pub fn boxed_model(mut self, model: Box<dyn PredictiveModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn tables(mut self, tables: RegionalTables) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn noise(self, noise: impl NoiseStrategy + 'static) -> Self {
        self.boxed_noise(Box::new(noise))
    }

    pub fn boxed_noise(mut self, noise: Box<dyn NoiseStrategy>) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Seed the random input used by the model self-test.
    pub fn self_test_seed(mut self, seed: u64) -> Self {
        self.self_test_seed = Some(seed);
        self
    }

    /// Validate the model and assemble the predictor.
    pub fn build(self) -> Result<Predictor, ConstructionError> {
        let model = self
            .model
            .unwrap_or_else(|| Box::new(SurrogateModel::default()));
        let adapter = ModelAdapter::with_self_test_seed(model, self.self_test_seed)?;
        let noise = self.noise.unwrap_or_else(|| Box::new(UniformNoise::new()));

        info!(
            "predictor ready: model={} noise={}",
            adapter.model_name(),
            noise.name()
        );
        Ok(Predictor {
            adapter,
            tables: self.tables.unwrap_or_default(),
            noise,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InferenceError;
    use crate::model::MODEL_OUTPUT_SHAPE;
    use crate::noise::{HashNoise, NoNoise};
    use ndarray::{Array4, ArrayView5};
    use std::sync::Arc;

    struct ConstantModel(f32);

    impl PredictiveModel for ConstantModel {
        fn predict(&self, _input: ArrayView5<'_, f32>) -> Result<Array4<f32>, InferenceError> {
            Ok(Array4::from_elem(MODEL_OUTPUT_SHAPE, self.0))
        }
    }

    fn predictor() -> Predictor {
        Predictor::builder()
            .noise(NoNoise)
            .self_test_seed(0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_predictor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predictor>();

        let shared = Arc::new(predictor());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&shared);
                std::thread::spawn(move || p.predict("20250615", 40.7, -74.0, Some("14:00")))
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_missing_time_defaults_to_midnight() {
        let result = predictor().predict("20250101", 0.0, 10.0, None).unwrap();
        assert_eq!(result.metadata.time, "00:00");
        assert_eq!(result.metadata.date, "20250101");
    }

    #[test]
    fn test_out_of_range_coordinates_clamped() {
        let result = predictor().predict("20250101", 123.0, -200.0, None).unwrap();
        assert_eq!(result.metadata.latitude, 90.0);
        assert_eq!(result.metadata.longitude, -180.0);
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        let err = predictor()
            .predict("20250101", f64::NAN, 0.0, None)
            .unwrap_err();
        assert!(matches!(
            err,
            PredictionError::Input(InputError::NonFiniteCoordinate { name: "latitude", .. })
        ));
        let err = predictor()
            .predict("20250101", 0.0, f64::INFINITY, None)
            .unwrap_err();
        assert_eq!(err.message(), "Invalid date/time format or input values");
    }

    #[test]
    fn test_malformed_date_is_input_error() {
        let err = predictor()
            .predict("2025-01-01", 0.0, 10.0, Some("12:00"))
            .unwrap_err();
        assert!(matches!(err, PredictionError::Input(_)));
    }

    #[test]
    fn test_constant_model_gives_zero_activity() {
        let p = Predictor::builder()
            .model(ConstantModel(0.7))
            .noise(HashNoise)
            .self_test_seed(0)
            .build()
            .unwrap();
        let result = p.predict("20250615", 27.0, 0.0, Some("12:00")).unwrap();
        assert_eq!(result.metadata.normalized_activity, 0.0);
        assert!((result.metadata.uncertainty - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_region_for_clamps() {
        let p = predictor();
        assert_eq!(p.region_for(95.0, 0.0).unwrap(), RegionType::Tundra);
        assert!(p.region_for(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_from_config_defaults() {
        let config = EngineConfig::default()
            .with_noise(crate::config::NoiseConfig::Hash)
            .with_self_test_seed(1);
        let p = Predictor::from_config(&config).unwrap();
        assert_eq!(p.noise_name(), "hash");
        assert_eq!(p.model_name(), "surrogate");
        assert_eq!(p.tables(), &RegionalTables::builtin());
    }

    #[test]
    fn test_from_config_missing_model_is_fatal() {
        let config = EngineConfig::default().with_model_path("/no/such/model.json");
        let err = Predictor::from_config(&config).unwrap_err();
        assert!(matches!(err, ConstructionError::ModelNotFound { .. }));
    }
}
