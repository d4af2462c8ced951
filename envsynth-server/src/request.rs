// EnvSynth Server - Request bodies and API errors
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Request bodies and API errors.
//!
//! Coordinates arrive from browsers as numbers or numeric strings; both are
//! accepted. Anything else is a client error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use envsynth::{PredictionError, SamplingError};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors returned by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed request field
    #[error("{0}")]
    BadRequest(String),

    /// The core rejected or failed the prediction
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    /// Heatmap sampling produced nothing usable
    #[error(transparent)]
    Sampling(#[from] SamplingError),

    /// The blocking prediction task panicked or was cancelled
    #[error("Prediction task failed: {0}")]
    Task(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Prediction(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.message(), "detail": e.to_string() }),
            ),
            ApiError::Sampling(e @ SamplingError::NoValidSamples { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            ),
            ApiError::Sampling(e) => (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() })),
            ApiError::Task(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": msg }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Body of `POST /predict` and `POST /predict/full`.
#[derive(Debug, Default, Deserialize)]
pub struct PredictBody {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    /// `YYYYMMDD`; now when absent
    pub date: Option<String>,
    /// `HH:MM`; now when absent
    pub time: Option<String>,
}

/// Body of `POST /heatmap-data`.
#[derive(Debug, Default, Deserialize)]
pub struct HeatmapBody {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    /// Degrees; server default when absent
    pub radius: Option<Value>,
}

const MISSING_COORDINATES: &str = "Missing required fields: latitude or longitude";

/// Coerce a JSON number or numeric string into `f64`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Required latitude/longitude pair.
pub fn coordinates(
    latitude: Option<&Value>,
    longitude: Option<&Value>,
) -> Result<(f64, f64), ApiError> {
    let (Some(lat), Some(lon)) = (latitude, longitude) else {
        return Err(ApiError::BadRequest(MISSING_COORDINATES.to_string()));
    };
    let field = |name: &str, v: &Value| {
        coerce_number(v).ok_or_else(|| ApiError::BadRequest(format!("{name} must be numeric")))
    };
    Ok((field("latitude", lat)?, field("longitude", lon)?))
}

/// Optional radius, in degrees.
pub fn radius(value: Option<&Value>) -> Result<Option<f64>, ApiError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce_number(v)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest("radius must be numeric".to_string())),
    }
}
