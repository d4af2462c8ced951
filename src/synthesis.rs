// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Activity-driven value synthesis.
//!
//! The normalized model activity `a` in [0, 1] pushes each adjusted
//! baseline upward: temperature along a sigmoid, gas and pollutants along
//! an exponential, humidity linearly. Pressure drops slightly with activity.

use crate::constraints::{HUMIDITY_RANGE, PRESSURE_RANGE};
use crate::noise::{NoiseContext, NoiseStrategy, SensorField};
use crate::tables::EnvValues;

/// Sigmoid (range, steepness) for both temperature sensors
pub const TEMPERATURE_SIGMOID: (f64, f64) = (15.0, 5.0);

pub const GAS_RESISTANCE_RANGE: f64 = 150_000.0;
pub const CO2_RANGE: f64 = 600.0;
pub const VOC_RANGE: f64 = 400.0;
pub const PM1_0_RANGE: f64 = 25.0;
pub const PM2_5_RANGE: f64 = 30.0;
pub const PM10_RANGE: f64 = 40.0;

/// Humidity gained per unit of activity, in %
pub const HUMIDITY_GAIN: f64 = 50.0;

/// Pressure lost per unit of activity, in hPa
pub const PRESSURE_DROP: f64 = 5.0;

/// `base + 2·range / (1 + e^(−steepness·(a − 0.5)))`
pub fn sigmoid_scale(base: f64, activity: f64, range: f64, steepness: f64) -> f64 {
    base + (2.0 * range) / (1.0 + (-steepness * (activity - 0.5)).exp())
}

/// `base + range · e^(3a) / e^3`
pub fn exp_scale(base: f64, activity: f64, range: f64) -> f64 {
    base + range * ((3.0 * activity).exp() / 3f64.exp())
}

/// Values produced by synthesis, before physical constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSensorValues {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub gas_resistance: f64,
    pub mcp9808_temperature: f64,
    pub co2: f64,
    pub voc: f64,
    pub pm1_0: f64,
    pub pm2_5: f64,
    pub pm10: f64,
}

impl RawSensorValues {
    pub fn get(&self, field: SensorField) -> f64 {
        match field {
            SensorField::Temperature => self.temperature,
            SensorField::Humidity => self.humidity,
            SensorField::Pressure => self.pressure,
            SensorField::GasResistance => self.gas_resistance,
            SensorField::Mcp9808Temperature => self.mcp9808_temperature,
            SensorField::Co2 => self.co2,
            SensorField::Voc => self.voc,
            SensorField::Pm1_0 => self.pm1_0,
            SensorField::Pm2_5 => self.pm2_5,
            SensorField::Pm10 => self.pm10,
        }
    }

    fn slot(&mut self, field: SensorField) -> &mut f64 {
        match field {
            SensorField::Temperature => &mut self.temperature,
            SensorField::Humidity => &mut self.humidity,
            SensorField::Pressure => &mut self.pressure,
            SensorField::GasResistance => &mut self.gas_resistance,
            SensorField::Mcp9808Temperature => &mut self.mcp9808_temperature,
            SensorField::Co2 => &mut self.co2,
            SensorField::Voc => &mut self.voc,
            SensorField::Pm1_0 => &mut self.pm1_0,
            SensorField::Pm2_5 => &mut self.pm2_5,
            SensorField::Pm10 => &mut self.pm10,
        }
    }
}

/// Noise-free synthesized values.
pub fn scale(adjusted: &EnvValues, activity: f64) -> RawSensorValues {
    let (t_range, t_steep) = TEMPERATURE_SIGMOID;
    let temperature = sigmoid_scale(adjusted.temperature, activity, t_range, t_steep);
    RawSensorValues {
        temperature,
        humidity: (adjusted.humidity + activity * HUMIDITY_GAIN)
            .clamp(HUMIDITY_RANGE.0, HUMIDITY_RANGE.1),
        pressure: (adjusted.pressure - activity * PRESSURE_DROP)
            .clamp(PRESSURE_RANGE.0, PRESSURE_RANGE.1),
        gas_resistance: exp_scale(adjusted.gas_resistance, activity, GAS_RESISTANCE_RANGE),
        mcp9808_temperature: temperature,
        co2: exp_scale(adjusted.co2, activity, CO2_RANGE),
        voc: exp_scale(adjusted.voc, activity, VOC_RANGE),
        pm1_0: exp_scale(adjusted.pm1_0, activity, PM1_0_RANGE),
        pm2_5: exp_scale(adjusted.pm2_5, activity, PM2_5_RANGE),
        pm10: exp_scale(adjusted.pm10, activity, PM10_RANGE),
    }
}

/// Scale adjusted values by activity and apply measurement noise.
///
/// Each field is perturbed independently; particulates are floored at 0
/// after noise.
pub fn synthesize(
    adjusted: &EnvValues,
    activity: f64,
    noise: &dyn NoiseStrategy,
    ctx: &NoiseContext,
) -> RawSensorValues {
    let mut values = scale(adjusted, activity);
    for field in SensorField::ALL {
        let slot = values.slot(field);
        let noisy = noise.perturb(*slot, field, ctx);
        *slot = if field.is_particulate() {
            noisy.max(0.0)
        } else {
            noisy
        };
    }
    values
}
