//! Great-circle distance between two coordinates.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Statute miles per nautical-mile-of-arc minute, as used by the relay.
const MILES_PER_ARC_MINUTE: f64 = 1.1515;

/// Unit for [`distance`]. Statute miles are the base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[default]
    #[serde(rename = "M")]
    Miles,
    #[serde(rename = "K")]
    Kilometers,
    #[serde(rename = "N")]
    NauticalMiles,
    #[serde(rename = "F")]
    Feet,
}

impl DistanceUnit {
    /// Factor applied to a distance in statute miles.
    pub fn factor(&self) -> f64 {
        match self {
            DistanceUnit::Miles => 1.0,
            DistanceUnit::Kilometers => 1.609344,
            DistanceUnit::NauticalMiles => 0.8684,
            DistanceUnit::Feet => 5280.0,
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = std::convert::Infallible;

    /// Unknown codes fall back to statute miles.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "K" => DistanceUnit::Kilometers,
            "N" => DistanceUnit::NauticalMiles,
            "F" => DistanceUnit::Feet,
            _ => DistanceUnit::Miles,
        })
    }
}

/// Distance between two points via the spherical law of cosines.
///
/// Identical points return exactly `0`. The cosine argument is clamped to
/// `[-1, 1]` so rounding never pushes `acos` out of its domain.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, unit: DistanceUnit) -> f64 {
    if lat1 == lat2 && lon1 == lon2 {
        return 0.0;
    }

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let theta = (lon1 - lon2).to_radians();

    let cos_arc = phi1.sin() * phi2.sin() + phi1.cos() * phi2.cos() * theta.cos();
    let arc_degrees = cos_arc.clamp(-1.0, 1.0).acos().to_degrees();
    let miles = arc_degrees * 60.0 * MILES_PER_ARC_MINUTE;

    miles * unit.factor()
}
