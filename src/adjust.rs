// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Seasonal and diurnal adjustment of regional baselines.
//!
//! Temperature and humidity shifts add across season and time of day;
//! pollution factors multiply.

use crate::constraints::HUMIDITY_RANGE;
use crate::region::RegionType;
use crate::tables::{EnvValues, RegionalTables};
use crate::temporal::TemporalFeatures;

/// Extra pollutant multipliers, (urban, everywhere else).
const VOC_BOOST: (f64, f64) = (1.2, 1.1);
const PM2_5_BOOST: (f64, f64) = (1.3, 1.2);
const PM10_BOOST: (f64, f64) = (1.4, 1.2);

fn boost(region: RegionType, factors: (f64, f64)) -> f64 {
    if region.is_urban() {
        factors.0
    } else {
        factors.1
    }
}

/// Combined shift for a region at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedShift {
    /// season + time-of-day, before the seasonal-sine scaling
    pub temp_shift: f64,
    /// season + time-of-day
    pub humidity_shift: f64,
    /// season x time-of-day
    pub pollution_factor: f64,
}

/// Combine the season and time-of-day rows for a region.
pub fn combined_shift(
    tables: &RegionalTables,
    region: RegionType,
    features: &TemporalFeatures,
) -> CombinedShift {
    let seasonal = tables.adjustments.seasonal(features.season, region);
    let diurnal = tables.adjustments.diurnal(features.time_of_day, region);
    CombinedShift {
        temp_shift: seasonal.temp_shift + diurnal.temp_shift,
        humidity_shift: seasonal.humidity_shift + diurnal.humidity_shift,
        pollution_factor: seasonal.pollution_factor * diurnal.pollution_factor,
    }
}

/// Adjust the regional baseline for season and time of day.
pub fn adjust(
    tables: &RegionalTables,
    region: RegionType,
    features: &TemporalFeatures,
) -> EnvValues {
    let base = tables.baseline(region);
    let shift = combined_shift(tables, region, features);
    let pf = shift.pollution_factor;

    EnvValues {
        temperature: base.temperature + shift.temp_shift * (1.0 + 0.1 * features.seasonal_sin),
        humidity: (base.humidity + shift.humidity_shift).clamp(HUMIDITY_RANGE.0, HUMIDITY_RANGE.1),
        pressure: base.pressure,
        gas_resistance: base.gas_resistance,
        co2: base.co2 * pf,
        voc: base.voc * pf * boost(region, VOC_BOOST),
        pm1_0: base.pm1_0 * pf,
        pm2_5: base.pm2_5 * pf * boost(region, PM2_5_BOOST),
        pm10: base.pm10 * pf * boost(region, PM10_BOOST),
    }
}
