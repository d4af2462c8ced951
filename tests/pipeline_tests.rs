// EnvSynth - Integration Tests
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! End-to-end tests of the prediction pipeline with stub models.

use approx::assert_relative_eq;
use envsynth::model::MODEL_OUTPUT_SHAPE;
use envsynth::region::elevation_factor;
use envsynth::synthesis::{exp_scale, sigmoid_scale};
use envsynth::*;
use ndarray::{Array4, ArrayView5};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

// ============================================================================
// Stub models
// ============================================================================

/// Same value everywhere: activity 0.
struct ConstantModel(f32);

impl PredictiveModel for ConstantModel {
    fn predict(&self, _input: ArrayView5<'_, f32>) -> std::result::Result<Array4<f32>, InferenceError> {
        Ok(Array4::from_elem(MODEL_OUTPUT_SHAPE, self.0))
    }
}

/// Mean field ramps 0..1 across columns: activity ~0.5.
struct RampModel;

impl PredictiveModel for RampModel {
    fn predict(&self, _input: ArrayView5<'_, f32>) -> std::result::Result<Array4<f32>, InferenceError> {
        let width = MODEL_OUTPUT_SHAPE[2];
        Ok(Array4::from_shape_fn(MODEL_OUTPUT_SHAPE, |(_, _, j, c)| {
            if c == 0 {
                j as f32 / (width - 1) as f32
            } else {
                0.1
            }
        }))
    }
}

/// Raises on every call.
struct RaisingModel;

impl PredictiveModel for RaisingModel {
    fn predict(&self, _input: ArrayView5<'_, f32>) -> std::result::Result<Array4<f32>, InferenceError> {
        Err(InferenceError::ModelFailed("session closed".to_string()))
    }
}

/// Passes the self-test, then raises.
#[derive(Default)]
struct FlakyModel {
    calls: AtomicUsize,
}

impl PredictiveModel for FlakyModel {
    fn predict(&self, _input: ArrayView5<'_, f32>) -> std::result::Result<Array4<f32>, InferenceError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Array4::zeros(MODEL_OUTPUT_SHAPE))
        } else {
            Err(InferenceError::ModelFailed("device lost".to_string()))
        }
    }
}

/// Mean field at 1 except one pixel: activity ~1.
struct SaturatingModel;

impl PredictiveModel for SaturatingModel {
    fn predict(&self, _input: ArrayView5<'_, f32>) -> std::result::Result<Array4<f32>, InferenceError> {
        Ok(Array4::from_shape_fn(MODEL_OUTPUT_SHAPE, |(_, i, j, c)| {
            match (c, i, j) {
                (1, _, _) => 0.05,
                (0, 0, 0) => 0.0,
                _ => 1.0,
            }
        }))
    }
}

/// Returns the wrong output shape.
struct WrongShapeModel;

impl PredictiveModel for WrongShapeModel {
    fn predict(&self, _input: ArrayView5<'_, f32>) -> std::result::Result<Array4<f32>, InferenceError> {
        Ok(Array4::zeros((1, 128, 128, 1)))
    }
}

fn build(model: impl PredictiveModel + 'static, noise: impl NoiseStrategy + 'static) -> Predictor {
    Predictor::builder()
        .model(model)
        .noise(noise)
        .self_test_seed(42)
        .build()
        .unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_nyc_summer_afternoon_without_noise() {
    let predictor = build(ConstantModel(0.3), NoNoise);
    let result = predictor
        .predict("20250615", 40.7, -74.0, Some("14:00"))
        .unwrap();

    assert_eq!(result.metadata.region, RegionType::Urban);
    assert_eq!(result.metadata.season, Season::Summer);
    assert_eq!(result.metadata.time_of_day, TimeOfDay::Afternoon);
    assert_eq!(result.metadata.normalized_activity, 0.0);

    // Urban baseline, summer 1.4 x afternoon 1.2, then urban boosts and calibration
    let pf = 1.4 * 1.2;
    assert_relative_eq!(
        result.co2.value,
        exp_scale(450.0 * pf, 0.0, 600.0) * 1.1,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        result.voc.value,
        exp_scale(300.0 * pf * 1.2, 0.0, 400.0) * 1.2,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        result.pm1_0.value,
        exp_scale(10.0 * pf, 0.0, 25.0) * 1.3,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        result.pm2_5.value,
        exp_scale(20.0 * pf * 1.3, 0.0, 30.0) * 1.3,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        result.pm10.value,
        exp_scale(30.0 * pf * 1.4, 0.0, 40.0) * 1.3,
        epsilon = 1e-9
    );

    let ef = elevation_factor(100.0);
    let dt = temporal::parse_timestamp("20250615", Some("14:00")).unwrap();
    let features = TemporalFeatures::extract(&dt);
    let adjusted_temp = 24.0 + 9.0 * (1.0 + 0.1 * features.seasonal_sin);
    let expected_temp = sigmoid_scale(adjusted_temp, 0.0, 15.0, 5.0) - ef * 2.0;
    assert_relative_eq!(result.bme688.temperature, expected_temp, epsilon = 1e-9);
    assert_relative_eq!(result.mcp9808.temperature, expected_temp, epsilon = 1e-9);

    assert_relative_eq!(result.bme688.humidity, 60.0, epsilon = 1e-9);
    assert_relative_eq!(
        result.bme688.pressure,
        1012.0 * (1.0 - ef * 0.00012),
        epsilon = 1e-9
    );
}

#[test]
fn test_urban_pollution_exceeds_rural_neighbour() {
    let predictor = build(ConstantModel(0.0), NoNoise);
    // Inside the NYC box vs. just outside it (agricultural band)
    let city = predictor.predict("20250615", 40.7, -74.0, Some("14:00")).unwrap();
    let outside = predictor.predict("20250615", 38.0, -78.0, Some("14:00")).unwrap();
    assert!(city.pm2_5.value > outside.pm2_5.value);
    assert!(city.voc.value > outside.voc.value);
}

#[test]
fn test_ramp_model_activity_near_half() {
    let predictor = build(RampModel, NoNoise);
    let result = predictor.predict("20250301", 0.0, 10.0, None).unwrap();
    assert_relative_eq!(result.metadata.normalized_activity, 0.5, epsilon = 1e-5);
    assert_relative_eq!(result.metadata.uncertainty, 0.1, epsilon = 1e-6);
}

#[test]
fn test_higher_activity_raises_pollutants() {
    let low = build(ConstantModel(0.5), NoNoise)
        .predict("20250301", 27.0, 0.0, Some("12:00"))
        .unwrap();
    let high = build(RampModel, NoNoise)
        .predict("20250301", 27.0, 0.0, Some("12:00"))
        .unwrap();
    assert!(high.co2.value > low.co2.value);
    assert!(high.bme688.gas_resistance > low.bme688.gas_resistance);
    assert!(high.bme688.temperature > low.bme688.temperature);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_hash_noise_is_bit_identical_across_predictors() {
    let a = build(RampModel, HashNoise)
        .predict("20250910", 51.5, -0.1, Some("08:15"))
        .unwrap();
    let b = build(RampModel, HashNoise)
        .predict("20250910", 51.5, -0.1, Some("08:15"))
        .unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
    assert_eq!(a, b);
}

#[test]
fn test_hash_noise_differs_from_no_noise() {
    let noisy = build(RampModel, HashNoise)
        .predict("20250910", 51.5, -0.1, Some("08:15"))
        .unwrap();
    let clean = build(RampModel, NoNoise)
        .predict("20250910", 51.5, -0.1, Some("08:15"))
        .unwrap();
    assert_ne!(noisy.co2.value, clean.co2.value);
    // Calibrated urban CO2: band of ±2.0 scaled by 1.1
    assert!((noisy.co2.value - clean.co2.value).abs() <= 2.0 * 1.1 + 1e-9);
}

#[test]
fn test_uniform_noise_varies_between_calls() {
    let predictor = build(RampModel, UniformNoise::seeded(5));
    let results: Vec<_> = (0..5)
        .map(|_| {
            predictor
                .predict("20250615", 35.7, 139.7, Some("18:00"))
                .unwrap()
        })
        .collect();
    assert!(results.windows(2).any(|w| w[0].co2.value != w[1].co2.value));

    let clean = build(RampModel, NoNoise)
        .predict("20250615", 35.7, 139.7, Some("18:00"))
        .unwrap();
    for r in &results {
        // Urban CO2 bound 2% of the value, then x1.1 calibration
        let bound = clean.co2.value / 1.1 * 0.02 * 1.1;
        assert!((r.co2.value - clean.co2.value).abs() <= bound + 1e-9);
    }
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_ranges_hold_everywhere() {
    let predictor = build(RampModel, UniformNoise::seeded(9));
    let dates = ["20250115", "20250415", "20250715", "20251015"];
    let times = ["03:00", "07:30", "13:00", "19:45"];
    for lat in (-85..=85).step_by(17) {
        for lon in (-175..=175).step_by(25) {
            for (date, time) in dates.iter().zip(times.iter()) {
                let r = predictor
                    .predict(date, lat as f64, lon as f64, Some(time))
                    .unwrap();
                assert!((10.0..=100.0).contains(&r.bme688.humidity), "{lat},{lon}");
                assert!((950.0..=1050.0).contains(&r.bme688.pressure), "{lat},{lon}");
                assert!(r.pm1_0.value >= 0.0);
                assert!(r.pm2_5.value >= 0.0);
                assert!(r.pm10.value >= 0.0);
                assert!((0.0..=1.0).contains(&r.metadata.normalized_activity));
                assert!(r.metadata.uncertainty >= 0.0);
            }
        }
    }
}

#[test]
fn test_mountain_pressure_clamped_into_range() {
    // Mountain baseline pressure is 900 hPa; the result must still be >= 950
    let predictor = build(ConstantModel(0.0), NoNoise);
    let r = predictor.predict("20250115", 40.0, -110.0, Some("12:00")).unwrap();
    assert_eq!(predictor.region_for(40.0, -110.0).unwrap(), RegionType::Mountain);
    assert_eq!(r.bme688.pressure, 950.0);
}

#[test]
fn test_saturated_humidity_and_pressure_stay_in_range_with_noise() {
    let strategies: Vec<Box<dyn NoiseStrategy>> =
        vec![Box::new(HashNoise), Box::new(UniformNoise::seeded(17))];
    for noise in strategies {
        let name = noise.name();
        let predictor = Predictor::builder()
            .model(SaturatingModel)
            .boxed_noise(noise)
            .self_test_seed(5)
            .build()
            .unwrap();

        // Coastal summer night: adjusted humidity already at 100 before the activity gain
        assert_eq!(predictor.region_for(-45.0, 5.0).unwrap(), RegionType::Coastal);
        for time in ["21:00", "23:00", "23:59"] {
            let r = predictor.predict("20250715", -45.0, 5.0, Some(time)).unwrap();
            assert!(r.metadata.normalized_activity > 0.99);
            assert!(r.bme688.humidity <= 100.0, "{name} {time}: {}", r.bme688.humidity);
            assert!(r.bme688.humidity >= 99.0, "{name} {time}: {}", r.bme688.humidity);
            assert!((950.0..=1050.0).contains(&r.bme688.pressure));
        }

        // Mountain: pressure driven below the floor, then lowered again by elevation
        for date in ["20250115", "20250715"] {
            let r = predictor.predict(date, 40.0, -110.0, Some("12:00")).unwrap();
            assert!(r.bme688.pressure >= 950.0, "{name} {date}: {}", r.bme688.pressure);
            assert!(r.bme688.pressure <= 951.0, "{name} {date}: {}", r.bme688.pressure);
            assert!((10.0..=100.0).contains(&r.bme688.humidity));
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_raising_model_fails_construction() {
    let err = Predictor::builder()
        .model(RaisingModel)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConstructionError::SelfTest(_)));
}

#[test]
fn test_wrong_shape_fails_construction() {
    let err = Predictor::builder()
        .model(WrongShapeModel)
        .build()
        .unwrap_err();
    match err {
        ConstructionError::ShapeMismatch { expected, actual } => {
            assert_eq!(expected, vec![1, 128, 128, 2]);
            assert_eq!(actual, vec![1, 128, 128, 1]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_inference_failure_is_tagged() {
    let predictor = build(FlakyModel::default(), NoNoise);
    let err = predictor
        .predict("20250615", 40.7, -74.0, Some("14:00"))
        .unwrap_err();
    assert!(matches!(err, PredictionError::Inference(_)));

    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["message"], "Prediction failed");
    assert!(json["error"].as_str().unwrap().contains("device lost"));
}

#[test]
fn test_bad_time_is_tagged_input_error() {
    let predictor = build(ConstantModel(0.0), NoNoise);
    let err = predictor
        .predict("20250615", 40.7, -74.0, Some("2pm"))
        .unwrap_err();
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["message"], "Invalid date/time format or input values");
}

// ============================================================================
// File-based construction
// ============================================================================

#[test]
fn test_tables_loaded_from_file() {
    let mut value: serde_json::Value =
        serde_json::from_str(&RegionalTables::builtin().to_json().unwrap()).unwrap();
    value["baselines"]["desert"]["CO2"] = serde_json::json!(830.0);

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", value).unwrap();

    let config = EngineConfig::default()
        .with_noise(NoiseConfig::Disabled)
        .with_tables_path(file.path())
        .with_self_test_seed(1);
    let custom = Predictor::from_config(&config).unwrap();
    let builtin = build(SurrogateModel::default(), NoNoise);

    let a = custom.predict("20250615", 27.0, 0.0, Some("14:00")).unwrap();
    let b = builtin.predict("20250615", 27.0, 0.0, Some("14:00")).unwrap();
    assert!(a.co2.value > b.co2.value);
    assert_eq!(a.voc.value, b.voc.value);
}

#[test]
fn test_incomplete_tables_rejected_at_construction() {
    let mut value: serde_json::Value =
        serde_json::from_str(&RegionalTables::builtin().to_json().unwrap()).unwrap();
    value["seasonal"]["winter"]["temp_shift"]
        .as_object_mut()
        .unwrap()
        .remove("tundra");

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", value).unwrap();

    let config = EngineConfig::default().with_tables_path(file.path());
    let err = Predictor::from_config(&config).unwrap_err();
    assert!(matches!(
        err,
        ConstructionError::IncompleteTable { ref table, ref region }
            if table == "seasonal.winter.temp_shift" && region == "tundra"
    ));
}

#[test]
fn test_surrogate_model_loaded_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"frame_weights": [0.0, 0.0, 1.0], "blur_radius": 0, "uncertainty_gain": 0.5}}"#
    )
    .unwrap();

    let config = EngineConfig::default()
        .with_noise(NoiseConfig::Hash)
        .with_model_path(file.path());
    let predictor = Predictor::from_config(&config).unwrap();
    assert_eq!(predictor.model_name(), "surrogate");

    let r = predictor.predict("20250615", 0.0, 10.0, Some("14:00")).unwrap();
    assert!((0.0..=1.0).contains(&r.metadata.normalized_activity));
}

#[test]
fn test_unparseable_model_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    let config = EngineConfig::default().with_model_path(file.path());
    let err = Predictor::from_config(&config).unwrap_err();
    assert!(matches!(err, ConstructionError::ModelUnreadable { .. }));
}
