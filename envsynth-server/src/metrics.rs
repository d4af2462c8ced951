// EnvSynth Server - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics exposed on `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};

lazy_static! {
    /// Predictions by outcome (success, input_error, inference_error).
    pub static ref PREDICTIONS_TOTAL: CounterVec = register_counter_vec!(
        "envsynth_predictions_total",
        "Predictions served, by outcome",
        &["outcome"]
    ).unwrap();

    /// Wall time of one pipeline run, including inference.
    pub static ref PREDICTION_SECONDS: Histogram = register_histogram!(
        "envsynth_prediction_duration_seconds",
        "Time spent in a single prediction",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    /// Heatmap sample points, by status (sampled, skipped).
    pub static ref HEATMAP_POINTS_TOTAL: CounterVec = register_counter_vec!(
        "envsynth_heatmap_points_total",
        "Heatmap sample points, by status",
        &["status"]
    ).unwrap();

    /// Heatmap requests that produced no valid point.
    pub static ref HEATMAP_FAILURES_TOTAL: Counter = register_counter!(
        "envsynth_heatmap_failures_total",
        "Heatmap requests with no valid sample"
    ).unwrap();
}

/// Outcome label of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    InputError,
    InferenceError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::InputError => "input_error",
            Outcome::InferenceError => "inference_error",
        }
    }
}

impl From<&envsynth::PredictionError> for Outcome {
    fn from(err: &envsynth::PredictionError) -> Self {
        match err {
            envsynth::PredictionError::Input(_) => Outcome::InputError,
            envsynth::PredictionError::Inference(_) => Outcome::InferenceError,
        }
    }
}

/// Record one prediction and its duration.
pub fn record_prediction(outcome: Outcome, seconds: f64) {
    PREDICTIONS_TOTAL
        .with_label_values(&[outcome.as_str()])
        .inc();
    PREDICTION_SECONDS.observe(seconds);
}

/// Record the result of a heatmap run.
pub fn record_heatmap(sampled: usize, skipped: usize) {
    HEATMAP_POINTS_TOTAL
        .with_label_values(&["sampled"])
        .inc_by(sampled as f64);
    HEATMAP_POINTS_TOTAL
        .with_label_values(&["skipped"])
        .inc_by(skipped as f64);
    if sampled == 0 {
        HEATMAP_FAILURES_TOTAL.inc();
    }
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
