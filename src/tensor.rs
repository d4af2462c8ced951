// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Synthetic input tensor generation.
//!
//! Builds the single-channel, three-frame patch sequence fed to the
//! predictive model. The patch is a radial field shaped by region, modulated
//! by seasonal and diurnal sinusoids and attenuated by elevation.

use crate::region::{classify, elevation_factor, RegionType};
use crate::temporal::TemporalFeatures;
use chrono::NaiveDateTime;
use ndarray::{Array2, Array4};

/// Side length of the square patch
pub const PATCH_SIZE: usize = 128;

/// Number of frames in the sequence
pub const SEQUENCE_LEN: usize = 3;

/// Per-frame weights, oldest first
pub const FRAME_WEIGHTS: [f64; SEQUENCE_LEN] = [0.85, 0.93, 1.0];

/// Shape of the generated tensor: `[frames, height, width, channels]`
pub const INPUT_SHAPE: [usize; 4] = [SEQUENCE_LEN, PATCH_SIZE, PATCH_SIZE, 1];

const PATCH_MIN: f64 = 0.1;
const PATCH_MAX: f64 = 1.0;

/// Radial shape function of a region over normalized distance in [0, 1].
fn shape(region: RegionType, dist: f64) -> f64 {
    match region {
        RegionType::Ocean => 0.3 + 0.7 * (-dist * 3.0).exp(),
        RegionType::Desert => 0.5 + 0.5 * (dist * 10.0).sin(),
        RegionType::Urban => 0.4 + 0.6 * (1.0 - dist * dist),
        _ => (-dist * 2.0).exp().max(0.2),
    }
}

/// Region multipliers on the (seasonal, diurnal) effect amplitudes.
fn effect_multipliers(region: RegionType) -> (f64, f64) {
    match region {
        RegionType::Ocean => (0.7, 0.5),
        RegionType::Desert => (1.2, 1.5),
        RegionType::Urban => (0.9, 1.2),
        _ => (1.0, 1.0),
    }
}

/// Distance from the patch center, normalized so the corners sit at 1.
pub fn radial_distance() -> Array2<f64> {
    let step = 2.0 / (PATCH_SIZE - 1) as f64;
    let axis = |k: usize| -1.0 + step * k as f64;
    Array2::from_shape_fn((PATCH_SIZE, PATCH_SIZE), |(i, j)| {
        let (x, y) = (axis(j), axis(i));
        (x * x + y * y).sqrt() / std::f64::consts::SQRT_2
    })
}

/// Single modulated, attenuated frame.
pub fn pattern_field(region: RegionType, features: &TemporalFeatures) -> Array2<f64> {
    let (seasonal_mult, diurnal_mult) = effect_multipliers(region);
    let seasonal = (0.5 * features.seasonal_sin + 0.2 * features.seasonal_cos) * seasonal_mult;
    let diurnal = (0.3 * features.diurnal_sin + 0.1 * features.diurnal_cos) * diurnal_mult;
    let modulation = (1.0 + seasonal) * (1.0 + diurnal * 0.5);
    let attenuation = elevation_factor(region.elevation_m());

    radial_distance().mapv(|d| (shape(region, d) * modulation).clamp(PATCH_MIN, PATCH_MAX) * attenuation)
}

/// Stack the weighted frames into the model input layout.
pub fn generate_for(region: RegionType, features: &TemporalFeatures) -> Array4<f32> {
    let field = pattern_field(region, features);
    Array4::from_shape_fn(
        (SEQUENCE_LEN, PATCH_SIZE, PATCH_SIZE, 1),
        |(t, i, j, _)| (field[[i, j]] * FRAME_WEIGHTS[t]) as f32,
    )
}

/// Generate the model input for a coordinate and timestamp.
pub fn generate(lat: f64, lon: f64, dt: &NaiveDateTime) -> Array4<f32> {
    generate_for(classify(lat, lon), &TemporalFeatures::extract(dt))
}
