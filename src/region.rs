// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Region classification module
//!
//! Maps a coordinate pair onto one of ten land-cover categories through an
//! ordered cascade of rectangle tests. The first matching rule wins; points
//! that match nothing fall back to [`RegionType::Grassland`].
//!
//! The rectangles overlap. Precedence, not geography, defines the answer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Land-cover category of a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    Ocean,
    Coastal,
    ForestTropical,
    ForestTemperate,
    Grassland,
    Desert,
    Tundra,
    Urban,
    Mountain,
    Agricultural,
}

impl RegionType {
    /// Number of variants
    pub const COUNT: usize = 10;

    /// All variants in ordinal order
    pub const ALL: [RegionType; Self::COUNT] = [
        RegionType::Ocean,
        RegionType::Coastal,
        RegionType::ForestTropical,
        RegionType::ForestTemperate,
        RegionType::Grassland,
        RegionType::Desert,
        RegionType::Tundra,
        RegionType::Urban,
        RegionType::Mountain,
        RegionType::Agricultural,
    ];

    /// Ordinal used to index fixed-size lookup tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            RegionType::Ocean => "ocean",
            RegionType::Coastal => "coastal",
            RegionType::ForestTropical => "forest_tropical",
            RegionType::ForestTemperate => "forest_temperate",
            RegionType::Grassland => "grassland",
            RegionType::Desert => "desert",
            RegionType::Tundra => "tundra",
            RegionType::Urban => "urban",
            RegionType::Mountain => "mountain",
            RegionType::Agricultural => "agricultural",
        }
    }

    /// Simplified elevation in meters
    pub fn elevation_m(self) -> f64 {
        match self {
            RegionType::Mountain => 2500.0,
            RegionType::Tundra => 200.0,
            RegionType::Ocean => -50.0,
            _ => 100.0,
        }
    }

    /// Whether urban calibration applies
    pub fn is_urban(self) -> bool {
        self == RegionType::Urban
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elevation attenuation: `1 - min(1, elevation / 5000)`.
///
/// Negative elevations push the factor slightly above 1.
pub fn elevation_factor(elevation_m: f64) -> f64 {
    1.0 - (elevation_m / 5000.0).min(1.0)
}

/// Geographic area tested by a rule. All bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Area {
    /// `lat.0 < lat < lat.1 && lon.0 < lon < lon.1`
    Box { lat: (f64, f64), lon: (f64, f64) },
    /// `|lat - center.0| < half.0 && |lon - center.1| < half.1`
    Around { center: (f64, f64), half: (f64, f64) },
}

impl Area {
    const fn bounds(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Area::Box {
            lat: (lat_min, lat_max),
            lon: (lon_min, lon_max),
        }
    }

    const fn city(lat: f64, lon: f64) -> Self {
        Area::Around {
            center: (lat, lon),
            half: (1.0, 1.5),
        }
    }

    /// Test whether a point lies inside the area
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        match *self {
            Area::Box { lat: la, lon: lo } => la.0 < lat && lat < la.1 && lo.0 < lon && lon < lo.1,
            Area::Around { center, half } => {
                (lat - center.0).abs() < half.0 && (lon - center.1).abs() < half.1
            }
        }
    }
}

/// One step of the cascade: any matching area yields `region`.
#[derive(Debug, Clone, Copy)]
pub struct RegionRule {
    pub region: RegionType,
    pub areas: &'static [Area],
}

impl RegionRule {
    /// Test whether any area of the rule contains the point
    pub fn matches(&self, lat: f64, lon: f64) -> bool {
        self.areas.iter().any(|a| a.contains(lat, lon))
    }
}

const INF: f64 = f64::INFINITY;

const MAJOR_CITIES: &[Area] = &[
    Area::city(40.7, -74.0),  // New York
    Area::city(51.5, -0.1),   // London
    Area::city(35.7, 139.7),  // Tokyo
    Area::city(19.1, 72.9),   // Mumbai
    Area::city(34.1, -118.2), // Los Angeles
    Area::city(41.9, 12.5),   // Rome
    Area::city(-23.5, -46.6), // Sao Paulo
    Area::city(30.0, 31.2),   // Cairo
    Area::city(39.9, 116.4),  // Beijing
    Area::city(55.8, 37.6),   // Moscow
];

const OCEAN: &[Area] = &[
    Area::bounds(-30.0, 30.0, 0.0, 20.0),
    Area::bounds(-30.0, 30.0, 60.0, 100.0),
    Area::bounds(-30.0, 30.0, 140.0, 180.0),
    Area::bounds(-30.0, 30.0, -140.0, -60.0),
    Area::bounds(-30.0, 30.0, -20.0, 0.0),
];

const DESERT: &[Area] = &[
    Area::bounds(15.0, 35.0, -120.0, -80.0),
    Area::bounds(15.0, 30.0, -10.0, 50.0),
    Area::bounds(20.0, 35.0, 50.0, 80.0),
    Area::bounds(-30.0, -15.0, 115.0, 150.0),
    Area::bounds(-30.0, -15.0, -80.0, -60.0),
];

const FOREST_TROPICAL: &[Area] = &[
    Area::bounds(-10.0, 10.0, -80.0, -50.0),
    Area::bounds(-10.0, 10.0, 10.0, 40.0),
    Area::bounds(-10.0, 10.0, 90.0, 150.0),
];

const FOREST_TEMPERATE: &[Area] = &[
    Area::bounds(40.0, 60.0, -10.0, 30.0),
    Area::bounds(40.0, 60.0, -130.0, -70.0),
    Area::bounds(30.0, 50.0, 120.0, 150.0),
];

const TUNDRA: &[Area] = &[
    Area::bounds(60.0, INF, -INF, INF),
    Area::bounds(-INF, -60.0, -INF, INF),
];

const MOUNTAIN: &[Area] = &[
    Area::bounds(35.0, 45.0, -120.0, -105.0),
    Area::bounds(-35.0, -20.0, -75.0, -60.0),
    Area::bounds(30.0, 40.0, 70.0, 90.0),
    Area::bounds(45.0, 50.0, 5.0, 15.0),
];

const COASTAL: &[Area] = &[
    Area::bounds(-INF, INF, -10.0, 10.0),
    Area::bounds(-INF, INF, 170.0, INF),
    Area::bounds(-INF, INF, -INF, -170.0),
    Area::bounds(-30.0, 30.0, 80.0, 100.0),
    Area::bounds(-30.0, 30.0, -100.0, -80.0),
];

const AGRICULTURAL: &[Area] = &[
    Area::bounds(25.0, 50.0, -105.0, -75.0),
    Area::bounds(45.0, 55.0, -5.0, 30.0),
    Area::bounds(-40.0, -20.0, -65.0, -50.0),
    Area::bounds(20.0, 40.0, 70.0, 100.0),
];

/// The classification cascade, evaluated top to bottom.
///
/// City boxes sit ahead of the temperate forest band, which covers New York
/// and London. Ocean, desert and tropical forest still win over a city box:
/// Mumbai classifies as ocean and Los Angeles as desert.
pub const RULES: &[RegionRule] = &[
    RegionRule { region: RegionType::Ocean, areas: OCEAN },
    RegionRule { region: RegionType::Desert, areas: DESERT },
    RegionRule { region: RegionType::ForestTropical, areas: FOREST_TROPICAL },
    RegionRule { region: RegionType::Urban, areas: MAJOR_CITIES },
    RegionRule { region: RegionType::ForestTemperate, areas: FOREST_TEMPERATE },
    RegionRule { region: RegionType::Tundra, areas: TUNDRA },
    RegionRule { region: RegionType::Mountain, areas: MOUNTAIN },
    RegionRule { region: RegionType::Coastal, areas: COASTAL },
    RegionRule { region: RegionType::Agricultural, areas: AGRICULTURAL },
];

/// Region returned when no rule matches
pub const FALLBACK_REGION: RegionType = RegionType::Grassland;

/// Classify a coordinate pair.
///
/// Total over all finite inputs; never fails.
pub fn classify(lat: f64, lon: f64) -> RegionType {
    RULES
        .iter()
        .find(|rule| rule.matches(lat, lon))
        .map(|rule| rule.region)
        .unwrap_or(FALLBACK_REGION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equatorial_ocean() {
        assert_eq!(classify(0.0, 10.0), RegionType::Ocean);
    }

    #[test]
    fn test_polar_tundra() {
        assert_eq!(classify(70.0, 0.0), RegionType::Tundra);
        assert_eq!(classify(-75.0, 120.0), RegionType::Tundra);
    }

    #[test]
    fn test_city_box_urban() {
        assert_eq!(classify(40.7, -74.0), RegionType::Urban);
        assert_eq!(classify(51.5, -0.1), RegionType::Urban);
        assert_eq!(classify(-23.0, -46.0), RegionType::Urban);
        // Just outside the 1.5 degree longitude half-width
        assert_ne!(classify(40.7, -72.4), RegionType::Urban);
    }

    #[test]
    fn test_earlier_bands_shadow_city_boxes() {
        // Mumbai lies in the 60..100 ocean band, Los Angeles in the -120..-80 desert band
        assert_eq!(classify(19.1, 72.9), RegionType::Ocean);
        assert_eq!(classify(34.1, -118.2), RegionType::Desert);
        // Tokyo and Cairo fall through to their city boxes
        assert_eq!(classify(35.7, 139.7), RegionType::Urban);
        assert_eq!(classify(30.0, 31.2), RegionType::Urban);
    }

    #[test]
    fn test_desert_wins_on_open_ocean_boundary() {
        // lon = 0 sits on the open edge of both ocean bands around the meridian
        assert_eq!(classify(27.0, 0.0), RegionType::Desert);
    }

    #[test]
    fn test_remaining_categories() {
        assert_eq!(classify(0.0, 25.0), RegionType::ForestTropical);
        assert_eq!(classify(50.0, 10.0), RegionType::ForestTemperate);
        assert_eq!(classify(37.0, -110.0), RegionType::Mountain);
        assert_eq!(classify(-45.0, 5.0), RegionType::Coastal);
        assert_eq!(classify(-30.0, -55.0), RegionType::Agricultural);
        assert_eq!(classify(-45.0, 160.0), RegionType::Grassland);
    }

    #[test]
    fn test_ocean_precedes_coastal() {
        // Inside both the ocean band and the coastal |lon| 80..100 band
        assert_eq!(classify(10.0, 90.0), RegionType::Ocean);
    }

    #[test]
    fn test_classify_total_and_idempotent() {
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lon = -180.0;
            while lon <= 180.0 {
                let first = classify(lat, lon);
                assert_eq!(first, classify(lat, lon));
                assert!(RegionType::ALL.contains(&first));
                lon += 7.5;
            }
            lat += 2.5;
        }
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, region) in RegionType::ALL.iter().enumerate() {
            assert_eq!(region.index(), i);
        }
    }

    #[test]
    fn test_elevation_steps() {
        assert_eq!(RegionType::Mountain.elevation_m(), 2500.0);
        assert_eq!(RegionType::Tundra.elevation_m(), 200.0);
        assert_eq!(RegionType::Ocean.elevation_m(), -50.0);
        assert_eq!(RegionType::Desert.elevation_m(), 100.0);
        assert!((elevation_factor(2500.0) - 0.5).abs() < 1e-12);
        assert!(elevation_factor(-50.0) > 1.0);
        assert_eq!(elevation_factor(9000.0), 0.0);
    }

    #[test]
    fn test_region_serde_names() {
        let json = serde_json::to_string(&RegionType::ForestTemperate).unwrap();
        assert_eq!(json, "\"forest_temperate\"");
        let back: RegionType = serde_json::from_str("\"urban\"").unwrap();
        assert_eq!(back, RegionType::Urban);
    }
}
