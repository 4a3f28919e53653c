//! The nearest-center scan.
//!
//! Every resolved county is compared against every care center in input
//! order, so the cost is `O(counties × centers)`. At national scale (a few
//! thousand counties, a few hundred centers) that is well under a second;
//! inputs much larger than that would want a spatial index instead.

use care_access_coverage_models::{CareCenter, CountyRecord, CoverageRecord};
use care_access_spatial::{DistanceBand, TravelTimeBand, distance_miles};

/// Average road speed used to turn great-circle miles into minutes.
pub const ASSUMED_SPEED_MPH: f64 = 50.0;

/// Approximate travel time in minutes for `miles` at [`ASSUMED_SPEED_MPH`].
#[must_use]
pub fn travel_minutes(miles: f64) -> f64 {
    miles / ASSUMED_SPEED_MPH * 60.0
}

/// The nearest center and its distance. Ties go to the earlier center.
fn nearest<'a>(county: &CountyRecord, centers: &'a [CareCenter]) -> Option<(&'a CareCenter, f64)> {
    let origin = county.coordinate()?;
    let mut best: Option<(&CareCenter, f64)> = None;
    for center in centers {
        let miles = distance_miles(origin, center.coordinate());
        if !miles.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, best_miles)| miles < best_miles) {
            best = Some((center, miles));
        }
    }
    best
}

/// Assigns each county its nearest center and classifies the result.
///
/// Output order matches `counties`. A county without a coordinate, or with
/// no usable center to compare against, keeps its row with both bands
/// `unknown`, no nearest-center fields, and `gap_flag = false`.
#[must_use]
pub fn compute_coverage(counties: &[CountyRecord], centers: &[CareCenter]) -> Vec<CoverageRecord> {
    let mut unresolved = 0_usize;
    let records: Vec<CoverageRecord> = counties
        .iter()
        .map(|county| {
            let found = nearest(county, centers);
            if found.is_none() {
                unresolved += 1;
                log::debug!("No nearest center for county {}", county.geo_id);
            }
            let miles = found.map(|(_, miles)| miles);
            let minutes = miles.map(travel_minutes);
            let distance_band = DistanceBand::classify(miles);
            let travel_time_band = TravelTimeBand::classify(minutes);

            CoverageRecord {
                state_fips: county.state_fips.clone(),
                county_fips: county.county_fips.clone(),
                geo_id: county.geo_id.clone(),
                county_name: county.county_name.clone(),
                latitude: county.latitude,
                longitude: county.longitude,
                nearest_center_id: found.map(|(center, _)| center.center_id.clone()),
                nearest_center_name: found.map(|(center, _)| center.name.clone()),
                great_circle_distance_miles: miles,
                approximate_travel_minutes: minutes,
                gap_flag: distance_band.is_worst_tier() || travel_time_band.is_worst_tier(),
                distance_band,
                travel_time_band,
                population_at_risk_mid: county.population_at_risk_mid,
            }
        })
        .collect();

    log::info!(
        "Computed coverage for {} counties against {} centers ({unresolved} unknown)",
        records.len(),
        centers.len(),
    );
    records
}

/// Gap counties, largest mid population estimate first.
///
/// Counties of equal estimate keep their coverage order.
#[must_use]
pub fn gap_counties(records: &[CoverageRecord]) -> Vec<CoverageRecord> {
    let mut gaps: Vec<CoverageRecord> = records.iter().filter(|r| r.gap_flag).cloned().collect();
    gaps.sort_by(|a, b| b.population_at_risk_mid.total_cmp(&a.population_at_risk_mid));
    gaps
}
