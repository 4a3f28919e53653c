#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic identifier and coordinate types.
//!
//! County identifiers are always carried as zero-padded digit strings
//! (2-digit state FIPS, 3-digit county FIPS, 5-digit GEOID), never as
//! integers, so leading zeros survive every CSV round-trip. The
//! `normalize_*` functions accept the sloppy shapes that show up in real
//! exports (`"1"`, `" 01 "`, `"1001.0"`, county codes carrying their state
//! prefix) and return the canonical form.

pub mod fips;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Width of a state FIPS code.
pub const STATE_FIPS_WIDTH: usize = 2;
/// Width of a county FIPS code.
pub const COUNTY_FIPS_WIDTH: usize = 3;
/// Width of a combined county GEOID.
pub const GEO_ID_WIDTH: usize = STATE_FIPS_WIDTH + COUNTY_FIPS_WIDTH;

/// A WGS84 latitude/longitude pair in decimal degrees.
///
/// Out-of-range values are not rejected; callers own their inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a coordinate from optional parts. Returns `None` unless both
    /// parts are present and finite.
    #[must_use]
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Self::new(lat, lon))
            }
            _ => None,
        }
    }
}

/// Which fallback tier produced a coordinate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionSource {
    /// Coordinate already present on the record.
    Existing,
    /// Precise centroid table keyed by GEOID.
    Lookup,
    /// Free-text geocoder.
    Geocoded,
    /// Static state centroid.
    Regional,
    /// Geographic center of the United States.
    Default,
}

/// A precise reference table keyed by canonical five-digit GEOID.
pub trait CentroidLookup {
    /// Returns the centroid for `geo_id`, if the table has one.
    fn centroid(&self, geo_id: &str) -> Option<Coordinate>;
}

impl CentroidLookup for std::collections::BTreeMap<String, Coordinate> {
    fn centroid(&self, geo_id: &str) -> Option<Coordinate> {
        self.get(geo_id).copied()
    }
}

/// Strips whitespace and a trailing `.0` (numeric exports) and returns the
/// digits, or `None` if anything other than ASCII digits remains.
fn digits(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(trimmed)
}

fn zero_pad(digits: &str, width: usize) -> String {
    format!("{digits:0>width$}")
}

/// Normalizes a state FIPS code to two digits (`"1"` -> `"01"`).
///
/// Returns `None` for non-numeric input or more than two digits.
#[must_use]
pub fn normalize_state_fips(raw: &str) -> Option<String> {
    let d = digits(raw)?;
    (d.len() <= STATE_FIPS_WIDTH).then(|| zero_pad(d, STATE_FIPS_WIDTH))
}

/// Normalizes a county FIPS code to three digits (`"1"` -> `"001"`).
///
/// Codes that were stored with their state prefix (`"01001"`, `"1001"`)
/// are truncated to the trailing three digits.
#[must_use]
pub fn normalize_county_fips(raw: &str) -> Option<String> {
    let d = digits(raw)?;
    match d.len() {
        0..=COUNTY_FIPS_WIDTH => Some(zero_pad(d, COUNTY_FIPS_WIDTH)),
        4..=GEO_ID_WIDTH => Some(d[d.len() - COUNTY_FIPS_WIDTH..].to_string()),
        _ => None,
    }
}

/// Normalizes a combined GEOID to five digits (`"1001"` -> `"01001"`).
#[must_use]
pub fn normalize_geo_id(raw: &str) -> Option<String> {
    let d = digits(raw)?;
    (d.len() <= GEO_ID_WIDTH).then(|| zero_pad(d, GEO_ID_WIDTH))
}

/// Composes a five-digit GEOID from raw state and county codes.
#[must_use]
pub fn geo_id(state_fips: &str, county_fips: &str) -> Option<String> {
    let state = normalize_state_fips(state_fips)?;
    let county = normalize_county_fips(county_fips)?;
    Some(format!("{state}{county}"))
}

/// Splits a canonical five-digit GEOID into `(state_fips, county_fips)`.
#[must_use]
pub fn split_geo_id(geo_id: &str) -> Option<(&str, &str)> {
    is_fixed_width_digits(geo_id, GEO_ID_WIDTH).then(|| geo_id.split_at(STATE_FIPS_WIDTH))
}

/// Whether `value` is exactly `width` ASCII digits.
#[must_use]
pub fn is_fixed_width_digits(value: &str, width: usize) -> bool {
    value.len() == width && value.bytes().all(|b| b.is_ascii_digit())
}
