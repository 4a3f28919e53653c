#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types shared by the coverage pipeline.
//!
//! Field names double as CSV column names, so every record reads from and
//! writes to the canonical tables directly.

use care_access_geography_models::{Coordinate, ResolutionSource};
use care_access_spatial::{DistanceBand, TravelTimeBand};
use serde::{Deserialize, Serialize};

/// A county with its population-at-risk estimates.
///
/// Reads from the county model table; unknown columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyRecord {
    /// Two-digit state FIPS code.
    pub state_fips: String,
    /// Three-digit county FIPS code.
    pub county_fips: String,
    /// Five-digit GEOID.
    pub geo_id: String,
    /// County display name.
    pub county_name: String,
    /// Lower population-at-risk estimate.
    #[serde(default)]
    pub population_at_risk_low: f64,
    /// Central population-at-risk estimate.
    #[serde(default)]
    pub population_at_risk_mid: f64,
    /// Upper population-at-risk estimate.
    #[serde(default)]
    pub population_at_risk_high: f64,
    /// Latitude, once known. Unparseable cells read as unknown.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    /// Longitude, once known.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
}

impl CountyRecord {
    /// The county's coordinate if both parts are present.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }

    /// Sets both coordinate parts.
    pub const fn set_coordinate(&mut self, coordinate: Option<Coordinate>) {
        match coordinate {
            Some(c) => {
                self.latitude = Some(c.latitude);
                self.longitude = Some(c.longitude);
            }
            None => {
                self.latitude = None;
                self.longitude = None;
            }
        }
    }
}

/// A care center as supplied by the curated input list.
///
/// Header spellings from older exports are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterInput {
    /// Facility name.
    #[serde(alias = "center_name")]
    pub name: String,
    /// Owning health system.
    #[serde(default, alias = "health_system")]
    pub parent_organization: String,
    /// City.
    #[serde(default)]
    pub city: String,
    /// State postal abbreviation or FIPS code.
    #[serde(default, alias = "state")]
    pub region_code: String,
    /// Year the center was certified.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub certification_year: Option<i32>,
    /// Known latitude, if any. Cells such as `N/A` read as unknown so the
    /// center falls through to the next resolution tier.
    #[serde(default, alias = "lat", deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    /// Known longitude, if any.
    #[serde(default, alias = "lon", alias = "lng", deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Website.
    #[serde(default)]
    pub website: Option<String>,
}

impl CenterInput {
    /// The free-text geocoding query for this center:
    /// `"{name}, {city}, {region}, USA"`, skipping blank parts.
    #[must_use]
    pub fn geocode_query(&self) -> String {
        [self.name.as_str(), self.city.as_str(), self.region_code.as_str(), "USA"]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The known coordinate if both parts are present.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }
}

/// A care center with its synthetic id and resolved coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareCenter {
    /// Sequential identifier (`CTR001`, `CTR002`, ...), stable for a
    /// given input order.
    pub center_id: String,
    /// Facility name.
    pub name: String,
    /// Owning health system.
    pub parent_organization: String,
    /// City.
    pub city: String,
    /// State postal abbreviation or FIPS code.
    pub region_code: String,
    /// Year the center was certified.
    pub certification_year: Option<i32>,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Which fallback tier produced the coordinate.
    pub coordinate_source: ResolutionSource,
    /// Contact phone.
    pub phone: Option<String>,
    /// Website.
    pub website: Option<String>,
}

impl CareCenter {
    /// Formats the sequential identifier for the `ordinal`-th center
    /// (1-based).
    #[must_use]
    pub fn make_id(ordinal: usize) -> String {
        format!("CTR{ordinal:03}")
    }

    /// Resolved coordinate.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// One county's nearest-center assignment.
///
/// Field order is the canonical coverage column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    /// Two-digit state FIPS code.
    pub state_fips: String,
    /// Three-digit county FIPS code.
    pub county_fips: String,
    /// Five-digit GEOID.
    pub geo_id: String,
    /// County display name.
    pub county_name: String,
    /// County latitude, if resolved.
    pub latitude: Option<f64>,
    /// County longitude, if resolved.
    pub longitude: Option<f64>,
    /// Nearest center's id; `None` when the county is unresolved.
    pub nearest_center_id: Option<String>,
    /// Nearest center's name.
    pub nearest_center_name: Option<String>,
    /// Great-circle distance to the nearest center.
    pub great_circle_distance_miles: Option<f64>,
    /// Distance divided by the assumed speed.
    pub approximate_travel_minutes: Option<f64>,
    /// Distance band.
    pub distance_band: DistanceBand,
    /// Travel-time band.
    pub travel_time_band: TravelTimeBand,
    /// Whether either band is in its worst tier.
    pub gap_flag: bool,
    /// Central population-at-risk estimate.
    pub population_at_risk_mid: f64,
}
