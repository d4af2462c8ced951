// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Temporal feature extraction.
//!
//! Turns a calendar timestamp into unit-circle encodings of the day of year
//! and minute of day, plus categorical season and time-of-day labels.

use crate::error::InputError;
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Time used when a request carries no time string.
pub const DEFAULT_TIME: &str = "00:00";

const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M";

/// Meteorological season (northern-hemisphere month mapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Season for a month in 1..=12. Anything outside spring/summer/fall is winter.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    /// Bucket for an hour in 0..=23: [5,11) morning, [11,16) afternoon,
    /// [16,21) evening, everything else night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=10 => TimeOfDay::Morning,
            11..=15 => TimeOfDay::Afternoon,
            16..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Features derived from a single timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalFeatures {
    /// `(day_of_year - 1) / 365`, wrapped into [0, 1)
    pub year_progress: f64,
    pub seasonal_sin: f64,
    pub seasonal_cos: f64,
    pub diurnal_sin: f64,
    pub diurnal_cos: f64,
    pub season: Season,
    pub time_of_day: TimeOfDay,
    /// 0..=23
    pub hour: u32,
    /// 1..=12
    pub month: u32,
}

impl TemporalFeatures {
    /// Extract features from a timestamp.
    pub fn extract(dt: &NaiveDateTime) -> Self {
        // Day 366 of a leap year lands on exactly 1.0; the encodings are periodic
        // so wrapping it back to 0.0 leaves sin/cos unchanged.
        let year_progress = ((dt.ordinal() - 1) as f64 / 365.0) % 1.0;
        let diurnal_progress = (dt.hour() * 60 + dt.minute()) as f64 / (24.0 * 60.0);

        let (seasonal_sin, seasonal_cos) = (2.0 * PI * year_progress).sin_cos();
        let (diurnal_sin, diurnal_cos) = (2.0 * PI * diurnal_progress).sin_cos();

        Self {
            year_progress,
            seasonal_sin,
            seasonal_cos,
            diurnal_sin,
            diurnal_cos,
            season: Season::from_month(dt.month()),
            time_of_day: TimeOfDay::from_hour(dt.hour()),
            hour: dt.hour(),
            month: dt.month(),
        }
    }
}

/// Parse a `YYYYMMDD` date and optional `HH:MM` time.
///
/// A missing or empty time means midnight.
pub fn parse_timestamp(date: &str, time: Option<&str>) -> Result<NaiveDateTime, InputError> {
    let input = format!("{} {}", date.trim(), effective_time(time).trim());
    NaiveDateTime::parse_from_str(&input, TIMESTAMP_FORMAT)
        .map_err(|_| InputError::InvalidTimestamp { input })
}

/// The time string a request is evaluated at.
pub fn effective_time(time: Option<&str>) -> &str {
    match time {
        Some(t) if !t.trim().is_empty() => t,
        _ => DEFAULT_TIME,
    }
}
