// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Regional baseline, adjustment and calibration tables.
//!
//! Tables are fixed-size arrays indexed by enum ordinal, so a lookup for a
//! known region can never miss. Tables loaded from JSON go through
//! [`RegionalTables::from_json_str`], which rejects any file that leaves a
//! region out of any sub-table.

use crate::error::{ConstructionError, EnvSynthError};
use crate::region::RegionType;
use crate::temporal::{Season, TimeOfDay};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const N: usize = RegionType::COUNT;

/// The nine scalar environmental quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvValues {
    /// °C
    pub temperature: f64,
    /// %
    pub humidity: f64,
    /// hPa
    pub pressure: f64,
    /// Ω
    pub gas_resistance: f64,
    /// ppm
    #[serde(rename = "CO2")]
    pub co2: f64,
    /// ppb
    #[serde(rename = "VOC")]
    pub voc: f64,
    /// µg/m³
    #[serde(rename = "PM1.0")]
    pub pm1_0: f64,
    /// µg/m³
    #[serde(rename = "PM2.5")]
    pub pm2_5: f64,
    /// µg/m³
    #[serde(rename = "PM10")]
    pub pm10: f64,
}

impl EnvValues {
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        temperature: f64,
        humidity: f64,
        pressure: f64,
        gas_resistance: f64,
        co2: f64,
        voc: f64,
        pm1_0: f64,
        pm2_5: f64,
        pm10: f64,
    ) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
            gas_resistance,
            co2,
            voc,
            pm1_0,
            pm2_5,
            pm10,
        }
    }
}

/// Shifts applied for one region in one season or time of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shift {
    /// °C, additive
    pub temp_shift: f64,
    /// %, additive
    pub humidity_shift: f64,
    /// multiplier on pollutant baselines
    pub pollution_factor: f64,
}

/// Three sub-tables keyed by region ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftTable {
    pub temp_shift: [f64; N],
    pub humidity_shift: [f64; N],
    pub pollution_factor: [f64; N],
}

impl ShiftTable {
    pub fn shift(&self, region: RegionType) -> Shift {
        let i = region.index();
        Shift {
            temp_shift: self.temp_shift[i],
            humidity_shift: self.humidity_shift[i],
            pollution_factor: self.pollution_factor[i],
        }
    }
}

/// Season x region and time-of-day x region shift tables.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentTable {
    /// Indexed by [`Season::index`]
    pub seasonal: [ShiftTable; 4],
    /// Indexed by [`TimeOfDay::index`]
    pub diurnal: [ShiftTable; 4],
}

impl AdjustmentTable {
    pub fn seasonal(&self, season: Season, region: RegionType) -> Shift {
        self.seasonal[season.index()].shift(region)
    }

    pub fn diurnal(&self, time_of_day: TimeOfDay, region: RegionType) -> Shift {
        self.diurnal[time_of_day.index()].shift(region)
    }
}

/// Multipliers applied after synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    #[serde(rename = "CO2")]
    pub co2: f64,
    #[serde(rename = "VOC")]
    pub voc: f64,
    /// Shared by PM1.0, PM2.5 and PM10
    #[serde(rename = "PM")]
    pub pm: f64,
}

/// Urban and rural calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    pub urban: Calibration,
    pub rural: Calibration,
}

impl CalibrationTable {
    pub fn for_region(&self, region: RegionType) -> Calibration {
        if region.is_urban() {
            self.urban
        } else {
            self.rural
        }
    }
}

/// All static configuration the synthesis pipeline reads.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalTables {
    /// Indexed by [`RegionType::index`]
    pub baselines: [EnvValues; N],
    pub adjustments: AdjustmentTable,
    pub calibration: CalibrationTable,
}

impl Default for RegionalTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RegionalTables {
    /// Built-in tables.
    pub fn builtin() -> Self {
        Self {
            baselines: BASELINES,
            adjustments: AdjustmentTable {
                seasonal: [SPRING, SUMMER, FALL, WINTER],
                diurnal: [MORNING, AFTERNOON, EVENING, NIGHT],
            },
            calibration: CALIBRATION,
        }
    }

    /// Baseline values for a region
    pub fn baseline(&self, region: RegionType) -> EnvValues {
        self.baselines[region.index()]
    }

    /// Load tables from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConstructionError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConstructionError::TablesUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text).map_err(|e| match e {
            ConstructionError::TablesUnreadable { reason, .. } => {
                ConstructionError::TablesUnreadable {
                    path: path.to_path_buf(),
                    reason,
                }
            }
            other => other,
        })
    }

    /// Parse and validate tables from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConstructionError> {
        let file: TablesFile =
            serde_json::from_str(json).map_err(|e| ConstructionError::TablesUnreadable {
                path: "<inline>".into(),
                reason: e.to_string(),
            })?;
        file.into_tables()
    }

    /// Serialize to the JSON file layout.
    pub fn to_json(&self) -> Result<String, EnvSynthError> {
        Ok(serde_json::to_string_pretty(&TablesFile::from_tables(self))?)
    }
}

/// On-disk layout: nested maps keyed by names.
#[derive(Debug, Serialize, Deserialize)]
struct TablesFile {
    baselines: HashMap<RegionType, EnvValues>,
    seasonal: HashMap<Season, ShiftTableFile>,
    diurnal: HashMap<TimeOfDay, ShiftTableFile>,
    calibration: CalibrationTable,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ShiftTableFile {
    temp_shift: HashMap<RegionType, f64>,
    humidity_shift: HashMap<RegionType, f64>,
    pollution_factor: HashMap<RegionType, f64>,
}

fn incomplete(table: String, region: &str) -> ConstructionError {
    ConstructionError::IncompleteTable {
        table,
        region: region.to_string(),
    }
}

fn dense<T: Copy>(
    map: &HashMap<RegionType, T>,
    table: &str,
    fill: T,
) -> Result<[T; N], ConstructionError> {
    let mut out = [fill; N];
    for region in RegionType::ALL {
        out[region.index()] = *map
            .get(&region)
            .ok_or_else(|| incomplete(table.to_string(), region.as_str()))?;
    }
    Ok(out)
}

impl ShiftTableFile {
    fn into_table(self, name: &str) -> Result<ShiftTable, ConstructionError> {
        Ok(ShiftTable {
            temp_shift: dense(&self.temp_shift, &format!("{name}.temp_shift"), 0.0)?,
            humidity_shift: dense(&self.humidity_shift, &format!("{name}.humidity_shift"), 0.0)?,
            pollution_factor: dense(
                &self.pollution_factor,
                &format!("{name}.pollution_factor"),
                1.0,
            )?,
        })
    }

    fn from_table(table: &ShiftTable) -> Self {
        let mut file = Self::default();
        for region in RegionType::ALL {
            let shift = table.shift(region);
            file.temp_shift.insert(region, shift.temp_shift);
            file.humidity_shift.insert(region, shift.humidity_shift);
            file.pollution_factor.insert(region, shift.pollution_factor);
        }
        file
    }
}

impl TablesFile {
    fn into_tables(mut self) -> Result<RegionalTables, ConstructionError> {
        let baselines = dense(&self.baselines, "baselines", BASELINES[0])?;

        let mut take_season = |season: Season| -> Result<ShiftTable, ConstructionError> {
            let name = format!("seasonal.{season}");
            self.seasonal
                .remove(&season)
                .ok_or_else(|| incomplete(name.clone(), "all"))?
                .into_table(&name)
        };
        let seasonal = [
            take_season(Season::Spring)?,
            take_season(Season::Summer)?,
            take_season(Season::Fall)?,
            take_season(Season::Winter)?,
        ];

        let mut take_time = |tod: TimeOfDay| -> Result<ShiftTable, ConstructionError> {
            let name = format!("diurnal.{tod}");
            self.diurnal
                .remove(&tod)
                .ok_or_else(|| incomplete(name.clone(), "all"))?
                .into_table(&name)
        };
        let diurnal = [
            take_time(TimeOfDay::Morning)?,
            take_time(TimeOfDay::Afternoon)?,
            take_time(TimeOfDay::Evening)?,
            take_time(TimeOfDay::Night)?,
        ];

        Ok(RegionalTables {
            baselines,
            adjustments: AdjustmentTable { seasonal, diurnal },
            calibration: self.calibration,
        })
    }

    fn from_tables(tables: &RegionalTables) -> Self {
        Self {
            baselines: RegionType::ALL
                .iter()
                .map(|r| (*r, tables.baseline(*r)))
                .collect(),
            seasonal: Season::ALL
                .iter()
                .map(|s| (*s, ShiftTableFile::from_table(&tables.adjustments.seasonal[s.index()])))
                .collect(),
            diurnal: TimeOfDay::ALL
                .iter()
                .map(|t| (*t, ShiftTableFile::from_table(&tables.adjustments.diurnal[t.index()])))
                .collect(),
            calibration: tables.calibration,
        }
    }
}

// ============================================================================
// Built-in data. Region column order:
// ocean, coastal, forest_tropical, forest_temperate, grassland,
// desert, tundra, urban, mountain, agricultural
// ============================================================================

const BASELINES: [EnvValues; N] = [
    //             temp   hum   press    gas      CO2    VOC   PM1   PM2.5 PM10
    EnvValues::new(18.0, 85.0, 1013.25, 80000.0, 410.0, 80.0, 2.0, 3.0, 4.0),
    EnvValues::new(22.0, 75.0, 1013.0, 60000.0, 420.0, 120.0, 5.0, 8.0, 10.0),
    EnvValues::new(26.0, 85.0, 1012.0, 50000.0, 430.0, 200.0, 4.0, 6.0, 8.0),
    EnvValues::new(18.0, 70.0, 1013.0, 55000.0, 425.0, 150.0, 3.0, 5.0, 7.0),
    EnvValues::new(20.0, 60.0, 1013.0, 50000.0, 420.0, 100.0, 4.0, 6.0, 9.0),
    EnvValues::new(30.0, 20.0, 1012.0, 30000.0, 415.0, 50.0, 10.0, 25.0, 50.0),
    EnvValues::new(-5.0, 70.0, 1015.0, 70000.0, 410.0, 30.0, 2.0, 3.0, 4.0),
    EnvValues::new(24.0, 65.0, 1012.0, 40000.0, 450.0, 300.0, 10.0, 20.0, 30.0),
    EnvValues::new(12.0, 60.0, 900.0, 60000.0, 415.0, 80.0, 3.0, 5.0, 7.0),
    EnvValues::new(22.0, 65.0, 1013.0, 45000.0, 435.0, 180.0, 6.0, 12.0, 15.0),
];

const SUMMER: ShiftTable = ShiftTable {
    temp_shift: [2.0, 4.0, 1.0, 6.0, 8.0, 12.0, 10.0, 5.0, 4.0, 6.0],
    humidity_shift: [5.0, 10.0, 5.0, 15.0, -10.0, -5.0, 20.0, 5.0, 5.0, 8.0],
    pollution_factor: [1.1, 1.2, 1.1, 1.1, 1.3, 1.5, 1.0, 1.4, 1.1, 1.3],
};

const WINTER: ShiftTable = ShiftTable {
    temp_shift: [-1.0, -3.0, 0.0, -8.0, -10.0, -5.0, -25.0, -4.0, -6.0, -5.0],
    humidity_shift: [0.0, 5.0, 0.0, -5.0, -5.0, -3.0, -10.0, -5.0, -5.0, -3.0],
    pollution_factor: [1.0, 1.1, 1.0, 1.2, 1.4, 1.2, 1.5, 1.6, 1.3, 1.4],
};

const SPRING: ShiftTable = ShiftTable {
    temp_shift: [1.0, 2.0, 0.5, 3.0, 4.0, 6.0, 5.0, 2.0, 2.0, 3.0],
    humidity_shift: [2.0, 8.0, 3.0, 10.0, 5.0, 2.0, 15.0, 3.0, 3.0, 5.0],
    pollution_factor: [1.0, 1.1, 1.0, 1.1, 1.2, 1.3, 1.1, 1.3, 1.1, 1.2],
};

const FALL: ShiftTable = ShiftTable {
    temp_shift: [0.5, 1.0, 0.5, 2.0, 3.0, 4.0, 2.0, 1.0, 1.0, 2.0],
    humidity_shift: [1.0, 5.0, 2.0, 8.0, 3.0, 1.0, 10.0, 2.0, 2.0, 3.0],
    pollution_factor: [1.0, 1.1, 1.0, 1.2, 1.3, 1.4, 1.2, 1.4, 1.2, 1.3],
};

const MORNING: ShiftTable = ShiftTable {
    temp_shift: [-0.5, -1.0, -0.5, -1.5, -2.0, -3.0, -1.0, -1.0, -1.5, -1.5],
    humidity_shift: [5.0, 10.0, 5.0, 10.0, 15.0, 10.0, 5.0, 8.0, 10.0, 12.0],
    pollution_factor: [1.0, 1.1, 1.0, 1.1, 1.2, 1.3, 1.0, 1.3, 1.1, 1.2],
};

const AFTERNOON: ShiftTable = ShiftTable {
    temp_shift: [1.0, 3.0, 2.0, 4.0, 6.0, 10.0, 3.0, 4.0, 3.0, 5.0],
    humidity_shift: [-5.0, -10.0, -5.0, -10.0, -15.0, -5.0, -5.0, -10.0, -10.0, -12.0],
    pollution_factor: [1.0, 1.0, 1.0, 1.0, 1.1, 1.2, 1.0, 1.2, 1.0, 1.1],
};

const EVENING: ShiftTable = ShiftTable {
    temp_shift: [0.5, 1.0, 0.5, 1.0, 2.0, 3.0, 1.0, 1.0, 1.0, 1.5],
    humidity_shift: [3.0, 8.0, 3.0, 8.0, 10.0, 5.0, 3.0, 5.0, 5.0, 8.0],
    pollution_factor: [1.1, 1.2, 1.1, 1.2, 1.3, 1.4, 1.1, 1.4, 1.2, 1.3],
};

const NIGHT: ShiftTable = ShiftTable {
    temp_shift: [-1.0, -2.0, -1.0, -3.0, -4.0, -8.0, -2.0, -2.0, -3.0, -3.0],
    humidity_shift: [8.0, 15.0, 8.0, 15.0, 20.0, 15.0, 10.0, 12.0, 15.0, 18.0],
    pollution_factor: [0.9, 0.9, 0.9, 0.9, 0.9, 0.8, 0.9, 1.0, 0.9, 0.9],
};

const CALIBRATION: CalibrationTable = CalibrationTable {
    urban: Calibration {
        co2: 1.1,
        voc: 1.2,
        pm: 1.3,
    },
    rural: Calibration {
        co2: 1.0,
        voc: 1.0,
        pm: 1.0,
    },
};
