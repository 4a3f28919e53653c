//! Headline numbers for a coverage run.

use std::collections::BTreeMap;

use care_access_coverage_models::{CareCenter, CoverageRecord};
use care_access_spatial::DistanceBand;
use serde::Serialize;

use crate::engine::gap_counties;

/// One entry of the gap ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapEntry {
    /// Five-digit GEOID.
    pub geo_id: String,
    /// County display name.
    pub county_name: String,
    /// Central population-at-risk estimate.
    pub population_at_risk_mid: f64,
    /// Distance to the nearest center.
    pub great_circle_distance_miles: Option<f64>,
}

/// Condensed view of a coverage table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    /// Counties in the table.
    pub counties: usize,
    /// Counties with a nearest center.
    pub resolved: usize,
    /// Counties flagged as gaps.
    pub gap_counties: usize,
    /// Sum of the mid estimate over all counties.
    pub total_population_mid: f64,
    /// Share (0 to 1) of the total mid estimate living in each distance
    /// band, keyed by band label. Every band, including `unknown`, is
    /// present.
    pub population_share_by_band: BTreeMap<String, f64>,
    /// Care centers per region code.
    pub centers_by_region: BTreeMap<String, usize>,
    /// The largest gap counties by mid estimate.
    pub top_gaps: Vec<GapEntry>,
}

impl CoverageSummary {
    /// Summarizes `records`, keeping the `top_n` largest gap counties.
    #[must_use]
    pub fn build(records: &[CoverageRecord], centers: &[CareCenter], top_n: usize) -> Self {
        let total: f64 = records.iter().map(|r| r.population_at_risk_mid.max(0.0)).sum();

        let mut by_band: BTreeMap<String, f64> = DistanceBand::known()
            .iter()
            .chain(std::iter::once(&DistanceBand::Unknown))
            .map(|band| (band.to_string(), 0.0))
            .collect();
        for record in records {
            *by_band.entry(record.distance_band.to_string()).or_default() +=
                record.population_at_risk_mid.max(0.0);
        }
        if total > 0.0 {
            for share in by_band.values_mut() {
                *share /= total;
            }
        }

        let mut centers_by_region = BTreeMap::new();
        for center in centers {
            *centers_by_region.entry(center.region_code.clone()).or_insert(0) += 1;
        }

        let gaps = gap_counties(records);
        let top_gaps = gaps
            .iter()
            .take(top_n)
            .map(|r| GapEntry {
                geo_id: r.geo_id.clone(),
                county_name: r.county_name.clone(),
                population_at_risk_mid: r.population_at_risk_mid,
                great_circle_distance_miles: r.great_circle_distance_miles,
            })
            .collect();

        Self {
            counties: records.len(),
            resolved: records.iter().filter(|r| r.nearest_center_id.is_some()).count(),
            gap_counties: gaps.len(),
            total_population_mid: total,
            population_share_by_band: by_band,
            centers_by_region,
            top_gaps,
        }
    }

    /// Writes the summary to the log at `info`.
    pub fn log(&self) {
        log::info!(
            "Coverage: {} counties, {} with a nearest center, {} gap counties",
            self.counties,
            self.resolved,
            self.gap_counties,
        );
        for (band, share) in &self.population_share_by_band {
            log::info!("  {band:>8}: {:5.1}% of modeled population", share * 100.0);
        }
        for gap in &self.top_gaps {
            log::info!(
                "  gap {} {}: {:.1} at risk, {}",
                gap.geo_id,
                gap.county_name,
                gap.population_at_risk_mid,
                gap.great_circle_distance_miles
                    .map_or_else(|| "distance unknown".to_string(), |mi| format!("{mi:.0} mi")),
            );
        }
    }
}
