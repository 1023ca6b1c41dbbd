use indicatif::HumanCount;
use serde::{Deserialize, Serialize};

use crate::matcher::ItemMatch;

/// Candidates further than this from the item, in metres, are implausible.
pub const DEFAULT_MAX_DISTANCE: f64 = 1000.0;

const EARTH_RADIUS_METRES: f64 = 6_371_008.8;
const METRES_PER_MILE: f64 = 1609.344;
const FEET_PER_METRE: f64 = 3.28084;
const FEET_PER_MILE: f64 = 5280.0;

// -------------------------------------------------------------------------------------------------
// Coordinate
// -------------------------------------------------------------------------------------------------
/// A WGS84 position in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in metres.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METRES * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

// -------------------------------------------------------------------------------------------------
// Distance filter
// -------------------------------------------------------------------------------------------------
/// Keep only the matches within 1000 metres of the item, preserving order.
pub fn filter_distant(matches: Vec<ItemMatch>) -> Vec<ItemMatch> {
    filter_distant_within(matches, DEFAULT_MAX_DISTANCE)
}

/// Keep only the matches within `max_distance` metres of the item, preserving order.
///
/// A match exactly at the threshold is kept.
pub fn filter_distant_within(matches: Vec<ItemMatch>, max_distance: f64) -> Vec<ItemMatch> {
    matches
        .into_iter()
        .filter(|m| m.dist <= max_distance)
        .collect()
}

// -------------------------------------------------------------------------------------------------
// DistanceUnits
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnits {
    Metres,
    Km,
    #[default]
    KmAndMetres,
    MilesAndFeet,
    MilesAndYards,
    MilesAndMetres,
}

/// Render a distance given in metres for people, in the chosen units.
///
/// The mixed units switch to the larger unit above half a kilometre or half a mile.
pub fn display_distance(units: DistanceUnits, metres: f64) -> String {
    match units {
        DistanceUnits::MilesAndFeet | DistanceUnits::MilesAndYards => {
            let total_feet = metres * FEET_PER_METRE;
            let miles = total_feet / FEET_PER_MILE;
            if miles > 0.5 {
                format!("{} miles", grouped(miles, 2))
            } else if units == DistanceUnits::MilesAndFeet {
                format!("{} feet", grouped(total_feet, 0))
            } else {
                format!("{} yards", grouped(total_feet / 3.0, 0))
            }
        }
        DistanceUnits::MilesAndMetres => {
            let miles = metres / METRES_PER_MILE;
            if miles > 0.5 {
                format!("{} miles", grouped(miles, 2))
            } else {
                format!("{} metres", grouped(metres, 0))
            }
        }
        DistanceUnits::KmAndMetres if metres > 500.0 => display_distance(DistanceUnits::Km, metres),
        DistanceUnits::KmAndMetres | DistanceUnits::Metres => {
            format!("{} m", grouped(metres, 0))
        }
        DistanceUnits::Km => format!("{} km", grouped(metres / 1000.0, 2)),
    }
}

/// Format `value` with `decimals` fractional digits and commas between groups of thousands.
fn grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, frac) = match formatted.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (formatted.as_str(), None),
    };
    let whole = match whole.parse::<u64>() {
        Ok(n) => HumanCount(n).to_string(),
        Err(_) => whole.to_owned(),
    };

    let sign = if value.is_sign_negative() && formatted.bytes().any(|c| matches!(c, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    match frac {
        Some(frac) => format!("{sign}{whole}.{frac}"),
        None => format!("{sign}{whole}"),
    }
}
