//! The county model table: one row per county with its age-band counts and
//! population-at-risk estimates.

use std::collections::BTreeSet;
use std::path::Path;

use care_access_dataset::Table;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::DemographicsError;
use crate::estimate::estimate;
use crate::params::PrevalenceParams;
use crate::population::CountyPopulation;

/// Output column order of the county model table.
pub const COUNTY_MODEL_COLUMNS: &[&str] = &[
    "state_fips",
    "county_fips",
    "geo_id",
    "county_name",
    "male_5_9",
    "male_10_14",
    "male_15_19",
    "male_20_24",
    "population_at_risk_low",
    "population_at_risk_mid",
    "population_at_risk_high",
    "methodology_note",
    "retrieved_date",
];

/// A row of the county model table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyModelRow {
    /// Two-digit state FIPS code.
    pub state_fips: String,
    /// Three-digit county FIPS code.
    pub county_fips: String,
    /// Five-digit GEOID.
    pub geo_id: String,
    /// County display name.
    pub county_name: String,
    /// Males 5-9.
    pub male_5_9: f64,
    /// Males 10-14.
    pub male_10_14: f64,
    /// Males 15-19.
    pub male_15_19: f64,
    /// Males 20-24.
    pub male_20_24: f64,
    /// Lower population-at-risk estimate.
    pub population_at_risk_low: f64,
    /// Central population-at-risk estimate.
    pub population_at_risk_mid: f64,
    /// Upper population-at-risk estimate.
    pub population_at_risk_high: f64,
    /// How the estimates were derived.
    pub methodology_note: String,
    /// Date the model was produced (UTC, `YYYY-MM-DD`).
    pub retrieved_date: NaiveDate,
}

/// Builds the county model from raw population.
///
/// The first row for each GEOID wins; later duplicates are dropped and
/// counted. Returns the rows and the duplicate count.
#[must_use]
pub fn build_county_model(
    populations: &[CountyPopulation],
    params: &PrevalenceParams,
    run_date: NaiveDate,
) -> (Vec<CountyModelRow>, usize) {
    let note = params.methodology_note();
    let mut seen = BTreeSet::new();
    let mut duplicates = 0;
    let mut rows = Vec::with_capacity(populations.len());

    for population in populations {
        if !seen.insert(population.geo_id.as_str()) {
            duplicates += 1;
            continue;
        }
        let counts = population.counts;
        let at_risk = estimate(counts.total(), params);
        rows.push(CountyModelRow {
            state_fips: population.state_fips.clone(),
            county_fips: population.county_fips.clone(),
            geo_id: population.geo_id.clone(),
            county_name: population.county_name.clone(),
            male_5_9: counts.male_5_9,
            male_10_14: counts.male_10_14,
            male_15_19: counts.male_15_19,
            male_20_24: counts.male_20_24,
            population_at_risk_low: at_risk.low,
            population_at_risk_mid: at_risk.mid,
            population_at_risk_high: at_risk.high,
            methodology_note: note.clone(),
            retrieved_date: run_date,
        });
    }

    if duplicates > 0 {
        log::warn!("Dropped {duplicates} duplicate county row(s) from the model (kept the first)");
    }
    log::info!("Modeled {} counties", rows.len());
    (rows, duplicates)
}

/// Writes the county model table to `path`.
///
/// # Errors
///
/// Returns [`DemographicsError::Dataset`] if serialization or writing
/// fails.
pub fn write_county_model(rows: &[CountyModelRow], path: &Path) -> Result<(), DemographicsError> {
    Table::from_records(rows, COUNTY_MODEL_COLUMNS)?.write(path)?;
    log::info!("Wrote county model to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::AgeBandCounts;

    fn population(geo_id: &str, name: &str, per_band: f64) -> CountyPopulation {
        CountyPopulation {
            state_fips: geo_id[..2].to_string(),
            county_fips: geo_id[2..].to_string(),
            geo_id: geo_id.to_string(),
            county_name: name.to_string(),
            counts: AgeBandCounts {
                male_5_9: per_band,
                male_10_14: per_band,
                male_15_19: per_band,
                male_20_24: per_band,
            },
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
    }

    #[test]
    fn models_each_county_once() {
        let (rows, duplicates) = build_county_model(
            &[
                population("01001", "First", 25_000.0),
                population("01003", "Second", 0.0),
                population("01001", "Duplicate", 1.0),
            ],
            &PrevalenceParams::default(),
            date(),
        );
        assert_eq!(duplicates, 1);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].county_name, "First");
        assert!((rows[0].population_at_risk_mid - 8.5).abs() < 1e-9);
        assert!(rows[1].population_at_risk_high.abs() < f64::EPSILON);
        assert!(rows[0].methodology_note.contains("per 10k"));
    }

    #[test]
    fn written_table_keeps_identifiers_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final/county_model.csv");
        let (rows, _) = build_county_model(
            &[population("06037", "Los Angeles County", 10.0)],
            &PrevalenceParams::default(),
            date(),
        );
        write_county_model(&rows, &path).unwrap();

        let table = Table::read(&path).unwrap();
        assert_eq!(table.headers(), COUNTY_MODEL_COLUMNS);
        assert_eq!(table.get(0, "state_fips"), Some("06"));
        assert_eq!(table.get(0, "county_fips"), Some("037"));
        assert_eq!(table.get(0, "retrieved_date"), Some("2025-08-01"));

        let back: Vec<CountyModelRow> = table.to_records().unwrap();
        assert_eq!(back, rows);
    }
}
