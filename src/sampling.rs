// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Heatmap sampling around a center point.
//!
//! Draws jittered coordinates from a seeded RNG, predicts each one and
//! keeps whatever succeeds. A failed point is logged and skipped; only a
//! batch with no successes is an error.

use crate::config::SamplingConfig;
use crate::error::SamplingError;
use crate::predictor::Predictor;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// US-EPA style PM2.5 air quality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Lower bin edges in µg/m³, one per category.
    pub const PM2_5_BINS: [f64; 6] = [0.0, 12.0, 35.4, 55.4, 150.4, 250.4];

    pub const ALL: [AqiCategory; 6] = [
        AqiCategory::Good,
        AqiCategory::Moderate,
        AqiCategory::UnhealthyForSensitiveGroups,
        AqiCategory::Unhealthy,
        AqiCategory::VeryUnhealthy,
        AqiCategory::Hazardous,
    ];

    /// Band for a PM2.5 concentration. Bins are right-inclusive.
    pub fn from_pm2_5(pm2_5: f64) -> Self {
        Self::PM2_5_BINS[1..]
            .iter()
            .position(|&upper| pm2_5 <= upper)
            .map(|i| Self::ALL[i])
            .unwrap_or(AqiCategory::Hazardous)
    }

    pub fn label(self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pollutant readings at one sampled coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "VOC")]
    pub voc: f64,
    #[serde(rename = "CO2")]
    pub co2: f64,
    #[serde(rename = "PM1_0")]
    pub pm1_0: f64,
    #[serde(rename = "PM2_5")]
    pub pm2_5: f64,
    #[serde(rename = "PM10")]
    pub pm10: f64,
    pub aqi: AqiCategory,
}

/// Result of one sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSamples {
    pub center: (f64, f64),
    pub radius_deg: f64,
    pub points: Vec<SamplePoint>,
    /// Points whose prediction failed
    pub skipped: usize,
}

impl HeatmapSamples {
    /// Min and max PM2.5 over the sampled points.
    pub fn pm2_5_range(&self) -> Option<(f64, f64)> {
        self.points.iter().map(|p| p.pm2_5).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Number of points in each AQI band, in band order.
    pub fn aqi_counts(&self) -> [usize; 6] {
        let mut counts = [0; 6];
        for point in &self.points {
            counts[point.aqi as usize] += 1;
        }
        counts
    }
}

/// Largest accepted sampling radius, in degrees
pub const MAX_RADIUS_DEG: f64 = 180.0;

/// Jittered offsets `(dlat, dlon)`, all latitude draws first.
///
/// The radius is capped at [`MAX_RADIUS_DEG`]; NaN or non-positive radii
/// yield zero offsets.
pub fn jitter_offsets(config: &SamplingConfig) -> Vec<(f64, f64)> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let r = config.radius_deg.min(MAX_RADIUS_DEG);
    let mut draw = |n: usize| -> Vec<f64> {
        (0..n)
            .map(|_| if r > 0.0 { rng.gen_range(-r..r) } else { 0.0 })
            .collect()
    };
    let lat = draw(config.points);
    let lon = draw(config.points);
    lat.into_iter().zip(lon).collect()
}

/// Predict pollutant levels on a jittered set of points around a center.
pub fn sample(
    predictor: &Predictor,
    center_lat: f64,
    center_lon: f64,
    date: &str,
    time: Option<&str>,
    config: &SamplingConfig,
) -> Result<HeatmapSamples, SamplingError> {
    if !(0.0..=MAX_RADIUS_DEG).contains(&config.radius_deg) {
        return Err(SamplingError::InvalidRadius(config.radius_deg));
    }
    if config.points == 0 {
        return Err(SamplingError::NoPoints);
    }

    let mut points = Vec::with_capacity(config.points);
    let mut skipped = 0;
    for (dlat, dlon) in jitter_offsets(config) {
        let (lat, lon) = (center_lat + dlat, center_lon + dlon);
        match predictor.predict(date, lat, lon, time) {
            Ok(result) => points.push(SamplePoint {
                latitude: lat,
                longitude: lon,
                voc: result.voc.value,
                co2: result.co2.value,
                pm1_0: result.pm1_0.value,
                pm2_5: result.pm2_5.value,
                pm10: result.pm10.value,
                aqi: AqiCategory::from_pm2_5(result.pm2_5.value),
            }),
            Err(e) => {
                warn!("skipping heatmap point {lat:.5},{lon:.5}: {e}");
                skipped += 1;
            }
        }
    }

    if points.is_empty() {
        return Err(SamplingError::NoValidSamples { skipped });
    }
    debug!(
        "sampled {} points around {center_lat:.4},{center_lon:.4} ({skipped} skipped)",
        points.len()
    );
    Ok(HeatmapSamples {
        center: (center_lat, center_lon),
        radius_deg: config.radius_deg,
        points,
        skipped,
    })
}
