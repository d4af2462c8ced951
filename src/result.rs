// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prediction result types.
//!
//! The serialized layout groups readings by sensor, matching what downstream
//! dashboards consume:
//!
//! ```json
//! {
//!   "BME688":  { "temperature": .., "humidity": .., "pressure": .., "gas_resistance": .. },
//!   "MCP9808": { "temperature": .. },
//!   "CO2": { "value": .. }, "VOC": { "value": .. },
//!   "PM1.0": { "value": .. }, "PM2.5": { "value": .. }, "PM10": { "value": .. },
//!   "metadata": { .. }
//! }
//! ```

use crate::model::Inference;
use crate::region::RegionType;
use crate::synthesis::RawSensorValues;
use crate::temporal::{Season, TemporalFeatures, TimeOfDay};
use serde::{Deserialize, Serialize};

/// Everything about a request the result echoes back.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub time: String,
    pub region: RegionType,
    pub features: TemporalFeatures,
    pub inference: Inference,
}

/// BME688 environmental sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bme688Reading {
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
    /// Ω
    pub gas_resistance: f64,
}

/// MCP9808 temperature sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mcp9808Reading {
    /// °C
    pub temperature: f64,
}

/// Single-valued gas or particulate sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarReading {
    pub value: f64,
}

/// Request echo and model diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetadata {
    /// Clamped into [-90, 90]
    pub latitude: f64,
    /// Clamped into [-180, 180]
    pub longitude: f64,
    /// As given, `YYYYMMDD`
    pub date: String,
    /// As given, or `"00:00"` when absent
    pub time: String,
    /// Region the coordinate classified into
    pub region: RegionType,
    pub season: Season,
    pub time_of_day: TimeOfDay,
    pub normalized_activity: f64,
    pub uncertainty: f64,
}

/// One complete prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "BME688")]
    pub bme688: Bme688Reading,
    #[serde(rename = "MCP9808")]
    pub mcp9808: Mcp9808Reading,
    #[serde(rename = "CO2")]
    pub co2: ScalarReading,
    #[serde(rename = "VOC")]
    pub voc: ScalarReading,
    #[serde(rename = "PM1.0")]
    pub pm1_0: ScalarReading,
    #[serde(rename = "PM2.5")]
    pub pm2_5: ScalarReading,
    #[serde(rename = "PM10")]
    pub pm10: ScalarReading,
    pub metadata: PredictionMetadata,
}

/// Package final values and request information into a result.
pub fn assemble(values: &RawSensorValues, info: RequestInfo) -> PredictionResult {
    PredictionResult {
        bme688: Bme688Reading {
            temperature: values.temperature,
            humidity: values.humidity,
            pressure: values.pressure,
            gas_resistance: values.gas_resistance,
        },
        mcp9808: Mcp9808Reading {
            temperature: values.mcp9808_temperature,
        },
        co2: ScalarReading { value: values.co2 },
        voc: ScalarReading { value: values.voc },
        pm1_0: ScalarReading {
            value: values.pm1_0,
        },
        pm2_5: ScalarReading {
            value: values.pm2_5,
        },
        pm10: ScalarReading { value: values.pm10 },
        metadata: PredictionMetadata {
            latitude: info.latitude,
            longitude: info.longitude,
            date: info.date,
            time: info.time,
            region: info.region,
            season: info.features.season,
            time_of_day: info.features.time_of_day,
            normalized_activity: info.inference.normalized_activity,
            uncertainty: info.inference.uncertainty,
        },
    }
}

/// Compact, display-formatted view of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub temperature: String,
    pub humidity: String,
    #[serde(rename = "CO2")]
    pub co2: String,
    #[serde(rename = "VOC")]
    pub voc: String,
    #[serde(rename = "PM1.0")]
    pub pm1_0: String,
    #[serde(rename = "PM2.5")]
    pub pm2_5: String,
    #[serde(rename = "PM10")]
    pub pm10: String,
}

impl PredictionResult {
    /// Format the headline readings for display.
    pub fn summary(&self) -> PredictionSummary {
        PredictionSummary {
            temperature: format!("{:.1}°C", self.bme688.temperature),
            humidity: format!("{:.1}%", self.bme688.humidity),
            co2: format!("{:.1} ppm", self.co2.value),
            voc: format!("{:.2}", self.voc.value),
            pm1_0: format!("{:.2}", self.pm1_0.value),
            pm2_5: format!("{:.2}", self.pm2_5.value),
            pm10: format!("{:.2}", self.pm10.value),
        }
    }
}
