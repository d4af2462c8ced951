// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Physical constraints applied after synthesis.

use crate::region::{elevation_factor, RegionType};
use crate::synthesis::RawSensorValues;
use crate::tables::CalibrationTable;

/// Valid relative humidity, in %
pub const HUMIDITY_RANGE: (f64, f64) = (10.0, 100.0);

/// Valid station pressure, in hPa
pub const PRESSURE_RANGE: (f64, f64) = (950.0, 1050.0);

/// °C removed per unit of elevation factor
pub const ELEVATION_TEMP_COEFF: f64 = 2.0;

/// Fractional pressure change per unit of elevation factor
pub const ELEVATION_PRESSURE_COEFF: f64 = 0.00012;

/// Apply the elevation correction and urban/rural calibration.
///
/// Humidity and pressure are clamped back into their valid ranges last, so
/// noise or the elevation factor can never push them out.
pub fn apply(
    mut values: RawSensorValues,
    region: RegionType,
    calibration: &CalibrationTable,
) -> RawSensorValues {
    let ef = elevation_factor(region.elevation_m());
    let temp_adjustment = ef * ELEVATION_TEMP_COEFF;
    values.temperature -= temp_adjustment;
    values.mcp9808_temperature -= temp_adjustment;
    values.pressure *= 1.0 - ef * ELEVATION_PRESSURE_COEFF;

    let cal = calibration.for_region(region);
    values.co2 *= cal.co2;
    values.voc *= cal.voc;
    values.pm1_0 *= cal.pm;
    values.pm2_5 *= cal.pm;
    values.pm10 *= cal.pm;

    values.humidity = values.humidity.clamp(HUMIDITY_RANGE.0, HUMIDITY_RANGE.1);
    values.pressure = values.pressure.clamp(PRESSURE_RANGE.0, PRESSURE_RANGE.1);
    values
}
