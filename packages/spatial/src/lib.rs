#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geo-math primitives for coverage analysis.
//!
//! Stateless helpers: great-circle distance on a spherical Earth and
//! classification of a value into named half-open bands. The band tables
//! used for distance and travel time live in [`bands`].

pub mod bands;

use care_access_geography_models::Coordinate;

pub use bands::{Band, DistanceBand, TravelTimeBand, classify_band};

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Great-circle distance in miles between two points using the haversine
/// formula.
///
/// Symmetric in its arguments and zero for identical points. Inputs are
/// not range-checked.
#[must_use]
pub fn great_circle_distance_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair outside [0, 1] for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Great-circle distance in miles between two [`Coordinate`]s.
#[must_use]
pub fn distance_miles(a: Coordinate, b: Coordinate) -> f64 {
    great_circle_distance_miles(a.latitude, a.longitude, b.latitude, b.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHICAGO: Coordinate = Coordinate::new(41.8781, -87.6298);
    const DENVER: Coordinate = Coordinate::new(39.7392, -104.9903);
    const HONOLULU: Coordinate = Coordinate::new(21.3069, -157.8583);

    #[test]
    fn zero_for_identical_points() {
        assert!(distance_miles(CHICAGO, CHICAGO).abs() < 1e-9);
        assert!(great_circle_distance_miles(0.0, 0.0, 0.0, 0.0).abs() < 1e-9);
    }

    #[test]
    fn symmetric() {
        for (a, b) in [(CHICAGO, DENVER), (DENVER, HONOLULU), (HONOLULU, CHICAGO)] {
            let ab = distance_miles(a, b);
            let ba = distance_miles(b, a);
            assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
        }
    }

    #[test]
    fn matches_known_distance() {
        // Chicago to Denver is roughly 920 miles as the crow flies.
        let d = distance_miles(CHICAGO, DENVER);
        assert!((900.0..940.0).contains(&d), "got {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = great_circle_distance_miles(40.0, -90.0, 41.0, -90.0);
        let expected = EARTH_RADIUS_MILES * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn monotonic_with_separation() {
        let mut last = 0.0;
        for step in 1..=18 {
            let d = great_circle_distance_miles(0.0, 0.0, 0.0, f64::from(step) * 10.0);
            assert!(d > last);
            last = d;
        }
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let d = great_circle_distance_miles(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - EARTH_RADIUS_MILES * std::f64::consts::PI).abs() < 1e-6);
    }
}
