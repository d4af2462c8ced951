// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Measurement noise strategies.
//!
//! Every synthesized field passes through a [`NoiseStrategy`] once. Three
//! implementations ship with the crate:
//!
//! - [`UniformNoise`]: bounded uniform noise from a process-level RNG
//! - [`HashNoise`]: reproducible noise derived from a SHA-256 of the request
//! - [`NoNoise`]: identity

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Mutex;

/// A synthesized output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorField {
    Temperature,
    Humidity,
    Pressure,
    GasResistance,
    Mcp9808Temperature,
    Co2,
    Voc,
    Pm1_0,
    Pm2_5,
    Pm10,
}

impl SensorField {
    pub const ALL: [SensorField; 10] = [
        SensorField::Temperature,
        SensorField::Humidity,
        SensorField::Pressure,
        SensorField::GasResistance,
        SensorField::Mcp9808Temperature,
        SensorField::Co2,
        SensorField::Voc,
        SensorField::Pm1_0,
        SensorField::Pm2_5,
        SensorField::Pm10,
    ];

    /// Parameter name used as hash input.
    pub fn param_name(self) -> &'static str {
        match self {
            SensorField::Temperature => "temperature",
            SensorField::Humidity => "humidity",
            SensorField::Pressure => "pressure",
            SensorField::GasResistance => "gas_resistance",
            SensorField::Mcp9808Temperature => "mcp9808_temperature",
            SensorField::Co2 => "CO2",
            SensorField::Voc => "VOC",
            SensorField::Pm1_0 => "PM1.0",
            SensorField::Pm2_5 => "PM2.5",
            SensorField::Pm10 => "PM10",
        }
    }

    /// `(relative_scale, absolute_min_noise)` for uniform noise.
    pub fn uniform_scale(self) -> (f64, f64) {
        match self {
            SensorField::Temperature | SensorField::Mcp9808Temperature => (0.01, 0.1),
            SensorField::Humidity => (0.005, 0.1),
            SensorField::Pressure => (0.001, 0.1),
            SensorField::GasResistance => (0.02, 0.1),
            SensorField::Co2 => (0.02, 1.0),
            SensorField::Voc => (0.02, 0.5),
            SensorField::Pm1_0 | SensorField::Pm2_5 | SensorField::Pm10 => (0.05, 0.1),
        }
    }

    /// Half-width of the hash noise band.
    pub fn hash_scale(self) -> f64 {
        match self {
            SensorField::Temperature | SensorField::Mcp9808Temperature => 0.3,
            SensorField::Humidity => 1.0,
            SensorField::Pressure => 0.5,
            SensorField::GasResistance => 1000.0,
            SensorField::Co2 => 2.0,
            SensorField::Voc => 5.0,
            SensorField::Pm1_0 => 0.5,
            SensorField::Pm2_5 => 0.7,
            SensorField::Pm10 => 1.0,
        }
    }

    pub fn is_particulate(self) -> bool {
        matches!(
            self,
            SensorField::Pm1_0 | SensorField::Pm2_5 | SensorField::Pm10
        )
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param_name())
    }
}

/// The request a value is being synthesized for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseContext {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: NaiveDateTime,
}

/// Additive measurement noise.
pub trait NoiseStrategy: Send + Sync {
    /// Return `value` with noise applied.
    fn perturb(&self, value: f64, field: SensorField, ctx: &NoiseContext) -> f64;

    /// Short identifier for logs and status output.
    fn name(&self) -> &'static str;
}

/// Bound of the uniform noise band for a value.
pub fn uniform_bound(value: f64, field: SensorField) -> f64 {
    let (relative, absolute_min) = field.uniform_scale();
    (value.abs() * relative).max(absolute_min)
}

/// Uniform noise in `[-b, b]` with `b = max(|v| * relative, absolute_min)`.
///
/// The RNG is created once and shared by every call; it is never reseeded,
/// so identical requests produce different (bounded) outputs.
pub struct UniformNoise {
    rng: Mutex<StdRng>,
}

impl UniformNoise {
    /// Entropy-seeded.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for UniformNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UniformNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformNoise").finish_non_exhaustive()
    }
}

impl NoiseStrategy for UniformNoise {
    fn perturb(&self, value: f64, field: SensorField, _ctx: &NoiseContext) -> f64 {
        let bound = uniform_bound(value, field);
        if !bound.is_finite() {
            return value;
        }
        // A panic while holding the lock cannot leave the RNG in a bad state.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        value + rng.gen_range(-bound..=bound)
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

/// Deterministic noise keyed on location, timestamp and parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashNoise;

const HASH_MODULUS: u32 = 10_000;

impl HashNoise {
    /// Hash input for one field of one request.
    pub fn key(field: SensorField, ctx: &NoiseContext) -> String {
        format!(
            "{:.6}_{:.6}_{}_{}",
            ctx.latitude,
            ctx.longitude,
            ctx.timestamp.format("%Y%m%d%H%M%S"),
            field.param_name()
        )
    }

    /// SHA-256 of `key` as a big-endian integer, reduced into [-1, 1).
    pub fn unit_offset(key: &str) -> f64 {
        let digest = Sha256::digest(key.as_bytes());
        let residue = digest
            .iter()
            .fold(0u32, |acc, &b| (acc * 256 + b as u32) % HASH_MODULUS);
        residue as f64 / HASH_MODULUS as f64 * 2.0 - 1.0
    }
}

impl NoiseStrategy for HashNoise {
    fn perturb(&self, value: f64, field: SensorField, ctx: &NoiseContext) -> f64 {
        value + Self::unit_offset(&Self::key(field, ctx)) * field.hash_scale()
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}

/// Identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNoise;

impl NoiseStrategy for NoNoise {
    fn perturb(&self, value: f64, _field: SensorField, _ctx: &NoiseContext) -> f64 {
        value
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ctx() -> NoiseContext {
        NoiseContext {
            latitude: 40.7,
            longitude: -74.0,
            timestamp: NaiveDate::from_ymd_opt(2025, 6, 15)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_uniform_stays_in_band() {
        let noise = UniformNoise::seeded(7);
        for field in SensorField::ALL {
            for value in [0.0, 1.0, 25.0, 1013.0, 150000.0, -12.0] {
                let bound = uniform_bound(value, field);
                for _ in 0..50 {
                    let out = noise.perturb(value, field, &ctx());
                    assert!((out - value).abs() <= bound + 1e-9, "{field}: {out} vs {value}");
                }
            }
        }
    }

    #[test]
    fn test_uniform_varies_between_calls() {
        let noise = UniformNoise::seeded(1);
        let first = noise.perturb(400.0, SensorField::Co2, &ctx());
        let varied = (0..20).any(|_| noise.perturb(400.0, SensorField::Co2, &ctx()) != first);
        assert!(varied);
    }

    #[test]
    fn test_uniform_seeded_is_reproducible() {
        let a = UniformNoise::seeded(99);
        let b = UniformNoise::seeded(99);
        for field in SensorField::ALL {
            assert_eq!(
                a.perturb(10.0, field, &ctx()),
                b.perturb(10.0, field, &ctx())
            );
        }
    }

    #[test]
    fn test_uniform_bound_uses_floor() {
        // 0.05 * 1.0 < 0.1
        assert_eq!(uniform_bound(1.0, SensorField::Pm2_5), 0.1);
        // 0.02 * 600 > 1.0
        assert_relative_eq!(uniform_bound(600.0, SensorField::Co2), 12.0);
        assert_relative_eq!(uniform_bound(-30.0, SensorField::Temperature), 0.3);
    }

    #[test]
    fn test_hash_key_format() {
        let key = HashNoise::key(SensorField::Pm2_5, &ctx());
        assert_eq!(key, "40.700000_-74.000000_20250615140000_PM2.5");
    }

    #[test]
    fn test_hash_is_deterministic_and_bounded() {
        for field in SensorField::ALL {
            let a = HashNoise.perturb(100.0, field, &ctx());
            let b = HashNoise.perturb(100.0, field, &ctx());
            assert_eq!(a.to_bits(), b.to_bits());
            assert!((a - 100.0).abs() <= field.hash_scale() + 1e-9);
        }
    }

    #[test]
    fn test_hash_distinguishes_fields() {
        let t = HashNoise::unit_offset(&HashNoise::key(SensorField::Temperature, &ctx()));
        let m = HashNoise::unit_offset(&HashNoise::key(SensorField::Mcp9808Temperature, &ctx()));
        assert_ne!(t, m);
    }

    #[test]
    fn test_unit_offset_range() {
        for i in 0..200 {
            let v = HashNoise::unit_offset(&format!("probe-{i}"));
            assert!((-1.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_no_noise_is_identity() {
        for field in SensorField::ALL {
            assert_eq!(NoNoise.perturb(3.25, field, &ctx()), 3.25);
        }
    }
}
